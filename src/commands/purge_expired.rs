use tracing::info;

use crate::App;

pub async fn run(app: App) -> anyhow::Result<()> {
    let count = app.pastes.purge_expired().await?;
    if count == 0 {
        info!("no expired pastes");
    }
    Ok(())
}
