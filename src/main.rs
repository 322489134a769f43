//! rasterd server binary
//!
//! Usage:
//!   rasterd [basePath] [port] [defaultViewportSize]
//!
//! Starts an HTTP server waiting for screenshot requests.

#[cfg(any(feature = "fetch", feature = "cdp"))]
mod server {
    use clap::Parser;
    use log::info;
    use rasterd::{parse_viewport_size, RasterService, ServiceConfig};

    /// HTTP screenshot service: rasterizes web pages to PNG files under a
    /// base directory.
    #[derive(Parser, Debug)]
    #[command(name = "rasterd", version, about)]
    struct Args {
        /// Directory screenshots are written under
        #[arg(default_value = "/tmp/")]
        base_path: String,

        /// Port the HTTP listener binds
        #[arg(default_value_t = 3001)]
        port: u16,

        /// Default viewport size as WIDTHxHEIGHT
        #[arg(default_value = "1024x600")]
        default_viewport_size: String,
    }

    pub async fn run() -> anyhow::Result<()> {
        let args = Args::parse();

        let config = ServiceConfig {
            base_path: args.base_path,
            port: args.port,
            default_viewport: parse_viewport_size(&args.default_viewport_size),
        };

        let handle = RasterService::new(config).start().await?;
        tokio::signal::ctrl_c().await?;
        info!("shutting down");
        handle.stop().await;
        Ok(())
    }
}

#[cfg(any(feature = "fetch", feature = "cdp"))]
#[tokio::main]
async fn main() -> anyhow::Result<()> {
    env_logger::init();
    server::run().await
}

#[cfg(not(any(feature = "fetch", feature = "cdp")))]
fn main() {
    eprintln!("rasterd was built without a page engine; enable the `fetch` or `cdp` feature");
    std::process::exit(1);
}
