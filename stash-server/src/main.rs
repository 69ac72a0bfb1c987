use anyhow::Result;

#[tokio::main]
async fn main() -> Result<()> {
    let config = stash_server::config::load();
    let snapshot = config.snapshot();
    stash_server::config::init_tracing(&snapshot);

    let ax = stash_server::build(&snapshot).await?;

    let host = snapshot
        .get_string("http.host")
        .unwrap_or_else(|| "127.0.0.1".to_string());
    let port = snapshot.get_u64("http.port").unwrap_or(3030);
    let addr = format!("{host}:{port}");

    ax.listen(addr).await?;

    Ok(())
}
