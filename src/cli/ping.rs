//! Ping command handler.

use color_eyre::Result;

use super::App;

impl App {
    /// Run `RETURN 1 AS x` and check the answer.
    pub async fn run_ping(&self) -> Result<()> {
        let executor = self.executor(None)?;

        let row = crate::cypher!(executor, "RETURN $n AS x", n = 1)
            .fetch_one()
            .await
            .map_err(|e| color_eyre::eyre::eyre!("Ping failed: {}", e))?;

        match row.map(|r| r.get::<i64>("x")).transpose()? {
            Some(1) => {
                tracing::info!("Database is reachable");
                Ok(())
            }
            other => Err(color_eyre::eyre::eyre!(
                "Unexpected ping answer: {:?}",
                other
            )),
        }
    }
}
