use std::{path::PathBuf, sync::Arc};

use anyhow::Context as _;
use clap::{Parser, Subcommand};

use ark_renderer::{
    AiRendererFilter, Backend, HostDelegate, HttpBackend, MemoryHost, ParamKind, RendererContext,
    RendererOpts,
    backend::process,
    filter::config::PLUGIN_MENU_ID,
    foundation::{core::ParamValue, logging::init_logging},
    host::bridge,
    imaging::{
        buffer::{ChannelOrder, ImageBuffer, PixelFormat},
        codec::{decode_png, encode_png},
    },
};

#[derive(Parser, Debug)]
#[command(name = "ark-renderer", version)]
struct Cli {
    /// Renderer options JSON.
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    /// Backend base URL (overrides config and environment).
    #[arg(long, global = true)]
    url: Option<String>,

    #[command(subcommand)]
    cmd: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Report whether the backend answers, and the login state.
    Status,
    /// List plugins, their endpoints and inputs.
    Plugins,
    /// Run one endpoint on a PNG, headless.
    Render(RenderArgs),
    /// Launch the backend from its installer config.
    StartBackend,
    /// Record a graceful shutdown and stop the backend.
    StopBackend,
}

#[derive(Parser, Debug)]
struct RenderArgs {
    /// Input PNG (the current source frame).
    #[arg(long = "in")]
    in_path: PathBuf,

    /// Output PNG path.
    #[arg(long)]
    out: PathBuf,

    /// Plugin name as listed by `plugins`.
    #[arg(long)]
    plugin: String,

    /// Endpoint name; defaults to the plugin's first listed endpoint.
    #[arg(long)]
    endpoint: Option<String>,

    /// Text prompt for endpoints that take one.
    #[arg(long, default_value = "")]
    prompt: String,

    /// Endpoint input value as `name=value`. Repeatable.
    #[arg(long = "set", value_name = "NAME=VALUE")]
    set: Vec<String>,
}

fn main() -> anyhow::Result<()> {
    init_logging("info");
    let cli = Cli::parse();
    let opts = load_opts(&cli)?;
    match cli.cmd {
        Command::Status => cmd_status(&opts),
        Command::Plugins => cmd_plugins(&opts),
        Command::Render(args) => cmd_render(&opts, args),
        Command::StartBackend => cmd_start_backend(&opts),
        Command::StopBackend => cmd_stop_backend(&opts),
    }
}

fn load_opts(cli: &Cli) -> anyhow::Result<RendererOpts> {
    let opts = match &cli.config {
        Some(path) => RendererOpts::from_path(path)?,
        None => RendererOpts::default(),
    }
    .with_env_overrides();
    Ok(match &cli.url {
        Some(url) => opts.with_base_url(url),
        None => opts,
    })
}

fn cmd_status(opts: &RendererOpts) -> anyhow::Result<()> {
    let backend = HttpBackend::new(opts)?;
    let running = backend.is_running();
    println!("backend: {} ({})", if running { "running" } else { "down" }, backend.base_url());
    if !running {
        return Ok(());
    }
    let logged_in = backend.login_status()?;
    println!("logged in: {logged_in}");
    if logged_in {
        println!("user: {}", backend.username()?);
        println!("subscription level: {}", backend.subscription_level()?);
    }
    Ok(())
}

fn cmd_plugins(opts: &RendererOpts) -> anyhow::Result<()> {
    let backend = HttpBackend::new(opts)?;
    for name in backend.plugin_list()? {
        let plugin = backend
            .plugin_info(&name)
            .with_context(|| format!("plugin info for '{name}'"))?;
        println!("{name}: {} {} (license {})", plugin.name, plugin.version, plugin.license_level);
        for endpoint in plugin.listed_endpoints() {
            println!("  {}", endpoint.name);
            for input in &endpoint.inputs {
                println!("    {} = {}", input.name, input.decl);
            }
        }
    }
    Ok(())
}

fn cmd_render(opts: &RendererOpts, args: RenderArgs) -> anyhow::Result<()> {
    let bytes = std::fs::read(&args.in_path)
        .with_context(|| format!("read input '{}'", args.in_path.display()))?;
    let source = decode_png(&bytes)?;
    let dest = ImageBuffer::new(source.width, source.height, PixelFormat::Rgba8, ChannelOrder::Rgba);
    let mut host = MemoryHost::new(source, dest).with_name("ark-renderer-cli");
    host.set_text_prompt(&args.prompt);

    let backend: Arc<dyn Backend> = Arc::new(HttpBackend::new(opts)?);
    let mut ctx = RendererContext::new(opts.clone(), backend);
    let mut filter = AiRendererFilter::from_opts(opts);
    anyhow::ensure!(filter.initialize(&mut ctx), "renderer did not initialize");
    bridge::register_params(&mut filter, &mut ctx, &mut host, true);

    let plugin_index = ctx
        .filter_configs()
        .iter()
        .position(|c| c.name == args.plugin)
        .with_context(|| format!("plugin '{}' not found", args.plugin))?;
    let filter_config = &ctx.filter_configs()[plugin_index];
    let endpoint_index = match &args.endpoint {
        Some(name) => filter_config
            .plugin
            .listed_endpoints()
            .position(|e| &e.name == name)
            .with_context(|| format!("endpoint '{name}' not found in '{}'", args.plugin))?,
        None => 0,
    };
    let endpoint_menu = filter_config
        .endpoint_param_id
        .with_context(|| format!("plugin '{}' has no endpoints", args.plugin))?;
    let endpoint = filter_config
        .endpoint(i32::try_from(endpoint_index)?)
        .context("endpoint out of range")?;
    let prefix = format!("{}.{}.", filter_config.plugin_name(), endpoint.name);

    let menu = filter
        .param_with_string_id(PLUGIN_MENU_ID)
        .context("plugin menu missing")?;
    host.set_value(menu.id, ParamValue::Int(i32::try_from(plugin_index)?));
    host.set_value(endpoint_menu, ParamValue::Int(i32::try_from(endpoint_index)?));

    for assignment in &args.set {
        let (name, raw) = assignment
            .split_once('=')
            .with_context(|| format!("expected NAME=VALUE, got '{assignment}'"))?;
        let param = filter
            .param_with_string_id(&format!("{prefix}{name}"))
            .with_context(|| format!("no input '{name}' on this endpoint"))?;
        let value = match param.kind {
            ParamKind::IntSlider { .. } => ParamValue::Int(raw.parse()?),
            ParamKind::FloatSlider { .. } => ParamValue::Float(raw.parse()?),
            ParamKind::Boolean { .. } => ParamValue::Bool(raw.parse()?),
            _ => anyhow::bail!("input '{name}' cannot be set from the command line"),
        };
        host.set_value(param.id, value);
    }

    bridge::update_params(&mut filter, &mut ctx, &mut host, None);
    anyhow::ensure!(filter.render(&mut ctx, &mut host), "render failed");

    let out = host.dest().context("no destination frame")?;
    if let Some(parent) = args.out.parent() {
        std::fs::create_dir_all(parent)
            .with_context(|| format!("create output dir '{}'", parent.display()))?;
    }
    std::fs::write(&args.out, encode_png(out)?)
        .with_context(|| format!("write output '{}'", args.out.display()))?;
    println!("wrote {}", args.out.display());
    Ok(())
}

fn cmd_start_backend(opts: &RendererOpts) -> anyhow::Result<()> {
    let backend = HttpBackend::new(opts)?;
    process::start_backend(&backend, opts)?;
    println!("backend running at {}", backend.base_url());
    Ok(())
}

fn cmd_stop_backend(opts: &RendererOpts) -> anyhow::Result<()> {
    let backend = HttpBackend::new(opts)?;
    backend.shutdown()?;
    println!("shutdown requested");
    Ok(())
}
