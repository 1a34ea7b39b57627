use super::*;

fn rgba(width: u32, height: u32, px: [u8; 4]) -> ImageBuffer {
    let data = px.repeat(width as usize * height as usize);
    ImageBuffer::from_raw(width, height, PixelFormat::Rgba8, ChannelOrder::Rgba, data).unwrap()
}

#[test]
fn identical_layout_is_a_byte_copy() {
    let src = rgba(2, 2, [10, 20, 30, 40]);
    let mut dst = ImageBuffer::new(2, 2, PixelFormat::Rgba8, ChannelOrder::Rgba);
    copy_image(&src, &mut dst, (1, 1)).unwrap();
    assert_eq!(dst, src);
}

#[test]
fn channel_swap_to_bgra() {
    let src = rgba(1, 1, [10, 20, 30, 40]);
    let mut dst = ImageBuffer::new(1, 1, PixelFormat::Rgba8, ChannelOrder::Bgra);
    copy_image(&src, &mut dst, (1, 1)).unwrap();
    assert_eq!(dst.data, vec![30, 20, 10, 40]);
}

#[test]
fn rgba_to_grey_replicates_alpha() {
    let src = rgba(2, 2, [255, 0, 0, 255]);
    let mut dst = ImageBuffer::new(2, 2, PixelFormat::Rgb8, ChannelOrder::Aaa);
    copy_image(&src, &mut dst, (1, 1)).unwrap();
    for px in dst.data.chunks_exact(3) {
        assert_eq!(px, [255, 255, 255]);
    }
}

#[test]
fn grey_to_rgba_sets_alpha_only() {
    let src =
        ImageBuffer::from_raw(1, 1, PixelFormat::Rgb8, ChannelOrder::Aaa, vec![9, 9, 9]).unwrap();
    let mut dst = rgba(1, 1, [1, 2, 3, 4]);
    copy_image(&src, &mut dst, (1, 1)).unwrap();
    assert_eq!(dst.data, vec![1, 2, 3, 9]);
}

#[test]
fn downsample_averages_blocks() {
    let mut src = ImageBuffer::new(4, 2, PixelFormat::Rgba8, ChannelOrder::Rgba);
    src.set_rgba_at(0, 0, [100, 0, 0, 255]);
    src.set_rgba_at(1, 0, [200, 0, 0, 255]);
    src.set_rgba_at(0, 1, [100, 0, 0, 255]);
    src.set_rgba_at(1, 1, [200, 0, 0, 255]);
    src.set_rgba_at(2, 0, [0, 40, 0, 255]);
    src.set_rgba_at(3, 1, [0, 40, 0, 255]);

    let mut dst = ImageBuffer::new(2, 1, PixelFormat::Rgba8, ChannelOrder::Rgba);
    copy_image(&src, &mut dst, (2, 2)).unwrap();
    assert_eq!(dst.rgba_at(0, 0), [150, 0, 0, 255]);
    assert_eq!(dst.rgba_at(1, 0), [0, 20, 0, 255]);
}

#[test]
fn downsample_block_past_source_is_black() {
    let src = rgba(3, 2, [50, 50, 50, 50]);
    let mut dst = ImageBuffer::new(2, 2, PixelFormat::Rgb8, ChannelOrder::Rgba);
    copy_image(&src, &mut dst, (2, 2)).unwrap();
    assert_eq!(dst.rgba_at(1, 0), [50, 50, 50, 255]);
    assert_eq!(dst.rgba_at(1, 1), [0, 0, 0, 255]);
}

#[test]
fn same_size_format_change_ignores_downsample() {
    // A decoded 3-channel result going into a proxy-sized 4-channel frame.
    let mut src = ImageBuffer::new(2, 2, PixelFormat::Rgb8, ChannelOrder::Rgba);
    src.set_rgba_at(1, 1, [200, 100, 50, 255]);
    src.set_rgba_at(0, 1, [1, 2, 3, 255]);
    let mut dst = rgba(2, 2, [9, 9, 9, 9]);
    copy_image(&src, &mut dst, (2, 2)).unwrap();
    assert_eq!(dst.rgba_at(1, 1), [200, 100, 50, 255]);
    assert_eq!(dst.rgba_at(0, 1), [1, 2, 3, 255]);
    assert_eq!(dst.rgba_at(0, 0), [0, 0, 0, 255]);

    let back = rgba(2, 2, [7, 8, 9, 10]);
    let mut bgr = ImageBuffer::new(2, 2, PixelFormat::Rgb8, ChannelOrder::Bgra);
    copy_image(&back, &mut bgr, (2, 2)).unwrap();
    assert_eq!(bgr.rgba_at(1, 1), [7, 8, 9, 255]);
    assert_eq!(bgr.pixel(1, 1), &[9, 8, 7]);
}

#[test]
fn short_data_is_rejected_before_copying() {
    let short = ImageBuffer {
        width: 2,
        height: 2,
        format: PixelFormat::Rgba8,
        order: ChannelOrder::Rgba,
        data: vec![0; 12],
    };
    let mut dst = rgba(2, 2, [0, 0, 0, 0]);
    assert!(matches!(
        copy_image(&short, &mut dst, (1, 1)),
        Err(ArkError::Validation(_))
    ));

    let short_mask = ImageBuffer {
        width: 2,
        height: 2,
        format: PixelFormat::Rgb8,
        order: ChannelOrder::Aaa,
        data: vec![0; 9],
    };
    assert!(matches!(
        copy_alpha_to_image(&short_mask, &mut dst),
        Err(ArkError::Validation(_))
    ));
    assert_eq!(dst.rgba_at(1, 1), [0, 0, 0, 0]);
}

#[test]
fn larger_destination_pads_with_black() {
    let src = rgba(1, 1, [7, 8, 9, 10]);
    let mut dst = ImageBuffer::new(2, 1, PixelFormat::Rgba8, ChannelOrder::Rgba);
    dst.fill(crate::foundation::core::Color {
        r: 1.0,
        g: 1.0,
        b: 1.0,
        a: 1.0,
    });
    copy_image(&src, &mut dst, (1, 1)).unwrap();
    assert_eq!(dst.rgba_at(0, 0), [7, 8, 9, 10]);
    assert_eq!(dst.rgba_at(1, 0), [0, 0, 0, 255]);
}

#[test]
fn invalid_layout_is_rejected() {
    let src = ImageBuffer {
        width: 1,
        height: 1,
        format: PixelFormat::Rgb8,
        order: ChannelOrder::Argb,
        data: vec![0, 0, 0],
    };
    let mut dst = rgba(1, 1, [0, 0, 0, 0]);
    assert!(matches!(
        copy_image(&src, &mut dst, (1, 1)),
        Err(ArkError::Validation(_))
    ));
}

#[test]
fn alpha_to_image_requires_matching_dimensions() {
    let grey = ImageBuffer::new(1, 1, PixelFormat::Rgb8, ChannelOrder::Aaa);
    let mut dst = rgba(2, 2, [1, 1, 1, 1]);
    assert!(copy_alpha_to_image(&grey, &mut dst).is_err());

    let mut grey = ImageBuffer::new(2, 2, PixelFormat::Rgb8, ChannelOrder::Aaa);
    grey.set_alpha_at(1, 1, 200);
    copy_alpha_to_image(&grey, &mut dst).unwrap();
    assert_eq!(dst.rgba_at(0, 0), [1, 1, 1, 0]);
    assert_eq!(dst.rgba_at(1, 1), [1, 1, 1, 200]);
}

#[test]
fn alpha_to_image_rejects_colour_source() {
    let src = rgba(1, 1, [0, 0, 0, 0]);
    let mut dst = rgba(1, 1, [0, 0, 0, 0]);
    assert!(copy_alpha_to_image(&src, &mut dst).is_err());
}

#[test]
fn resize_up_keeps_layout_and_flat_colour() {
    let src = ImageBuffer::from_raw(
        2,
        2,
        PixelFormat::Rgb8,
        ChannelOrder::Aaa,
        [120u8, 120, 120].repeat(4),
    )
    .unwrap();
    let big = resize_up(&src, 5, 3).unwrap();
    assert_eq!((big.width, big.height), (5, 3));
    assert_eq!(big.format, PixelFormat::Rgb8);
    assert_eq!(big.order, ChannelOrder::Aaa);
    assert!(big.data.iter().all(|&v| v == 120));
}
