use std::{
    io::{BufRead, BufReader, Read, Write},
    net::TcpListener,
    sync::mpsc,
    thread,
};

use super::*;

type Seen = mpsc::Receiver<(String, Vec<u8>)>;

/// Answers one request per canned response, in order, and reports each request line and body.
fn serve(responses: Vec<(u16, &'static [u8])>) -> (String, Seen) {
    let listener = TcpListener::bind("127.0.0.1:0").unwrap();
    let base = format!("http://{}/", listener.local_addr().unwrap());
    let (tx, rx) = mpsc::channel();
    thread::spawn(move || {
        for (status, body) in responses {
            let (mut stream, _) = listener.accept().unwrap();
            let mut reader = BufReader::new(stream.try_clone().unwrap());
            let mut request_line = String::new();
            reader.read_line(&mut request_line).unwrap();
            let mut content_length = 0usize;
            loop {
                let mut line = String::new();
                reader.read_line(&mut line).unwrap();
                if line == "\r\n" || line.is_empty() {
                    break;
                }
                if let Some((k, v)) = line.split_once(':')
                    && k.eq_ignore_ascii_case("content-length")
                {
                    content_length = v.trim().parse().unwrap();
                }
            }
            let mut req_body = vec![0; content_length];
            reader.read_exact(&mut req_body).unwrap();
            tx.send((request_line.trim_end().to_string(), req_body))
                .unwrap();

            write!(
                stream,
                "HTTP/1.1 {status} X\r\ncontent-length: {}\r\nconnection: close\r\n\r\n",
                body.len()
            )
            .unwrap();
            stream.write_all(body).unwrap();
        }
    });
    (base, rx)
}

fn backend(base: &str) -> HttpBackend {
    HttpBackend::new(&RendererOpts::default().with_base_url(base)).unwrap()
}

#[test]
fn ui_page_paths() {
    assert_eq!(UiPage::Login.path(), "ui/login");
    assert_eq!(UiPage::PluginManager.path(), "ui/plugin_manager");
    assert_eq!(UiPage::ReportIssue.path(), "ui/report_issue");
    assert_eq!(UiPage::Configure("sd".into()).path(), "ui/configure/sd");
}

#[test]
fn plugin_list_is_a_get() {
    let (base, seen) = serve(vec![(200, br#"{"plugins": ["sd", "bisenet"]}"#)]);
    let list = backend(&base).plugin_list().unwrap();
    assert_eq!(list, ["sd", "bisenet"]);
    let (line, _) = seen.recv().unwrap();
    assert_eq!(line, "GET /plugins/get_list HTTP/1.1");
}

#[test]
fn non_success_status_is_connectivity() {
    let (base, _seen) = serve(vec![(500, b"boom")]);
    let err = backend(&base).login_status().unwrap_err();
    assert!(err.is_connectivity(), "unexpected error: {err:?}");
}

#[test]
fn nothing_listening_means_not_running() {
    let port = TcpListener::bind("127.0.0.1:0")
        .unwrap()
        .local_addr()
        .unwrap()
        .port();
    let b = backend(&format!("http://127.0.0.1:{port}/"));
    assert!(!b.is_running());
}

#[test]
fn call_endpoint_puts_json_body() {
    let (base, seen) = serve(vec![(200, br#"{"job_id": "job-9"}"#)]);
    let job = backend(&base)
        .call_endpoint("sd", "generate_image", r#"{"prompt": "a cat"}"#)
        .unwrap();
    assert_eq!(job, "job-9");
    let (line, body) = seen.recv().unwrap();
    assert_eq!(line, "PUT /plugins/call_endpoint/sd/generate_image HTTP/1.1");
    assert_eq!(body, br#"{"prompt": "a cat"}"#);
}

#[test]
fn data_store_paths() {
    let (base, seen) = serve(vec![
        (200, b""),
        (200, br#"{"parameters": []}"#),
        (200, b""),
    ]);
    let b = backend(&base);
    b.set_data("ark.ai_renderer", r#"{"parameters": []}"#).unwrap();
    assert_eq!(b.get_data("ark.ai_renderer").unwrap(), r#"{"parameters": []}"#);
    b.delete_data("ark.ai_renderer").unwrap();

    let lines: Vec<String> = seen.iter().take(3).map(|(l, _)| l).collect();
    assert_eq!(
        lines,
        [
            "PUT /data/store/ark.ai_renderer HTTP/1.1",
            "GET /data/retrieve/ark.ai_renderer HTTP/1.1",
            "DELETE /data/delete/ark.ai_renderer HTTP/1.1",
        ]
    );
}

#[test]
fn upload_images_substitutes_failures() {
    let (base, seen) = serve(vec![
        (200, br#"{"status": "Success", "image_id": "img-1"}"#),
        (500, b""),
    ]);
    let png = vec![0x89, b'P', b'N', b'G'];
    let ids = backend(&base).upload_images(&[Some(png.clone()), None, Some(png)]);
    assert_eq!(ids, ["img-1", "-1", "-1"]);

    let (line, body) = seen.recv().unwrap();
    assert_eq!(line, "POST /image/upload HTTP/1.1");
    let body = String::from_utf8_lossy(&body);
    assert!(body.contains(r#"name="file""#));
    assert!(body.contains("temp_data_file.png"));
}

#[test]
fn shutdown_flag_round_trip() {
    let (base, seen) = serve(vec![
        (200, br#"{"shutdown": "true"}"#),
        (200, b""),
        (200, b""),
    ]);
    let b = backend(&base);
    assert!(b.has_shutdown_gracefully());
    b.shutdown().unwrap();

    let reqs: Vec<(String, Vec<u8>)> = seen.iter().take(3).collect();
    assert_eq!(reqs[1].0, "PUT /data/store/shutdown HTTP/1.1");
    assert_eq!(reqs[1].1, br#"{"shutdown":"true"}"#);
    assert_eq!(reqs[2].0, "GET /backend/shutdown HTTP/1.1");
}

#[test]
fn fetch_image_returns_raw_bytes() {
    let (base, _seen) = serve(vec![(200, b"\x89PNG-bytes"), (200, b"")]);
    let b = backend(&base);
    assert_eq!(b.fetch_image("img-1").unwrap(), b"\x89PNG-bytes");
    assert!(matches!(b.fetch_image("img-2"), Err(ArkError::Resource(_))));
}
