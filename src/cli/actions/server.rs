use crate::cli::actions::Action;
use crate::littlejoys;
use anyhow::Result;

/// Handle the server action
pub async fn handle(action: Action) -> Result<()> {
    match action {
        Action::Server { port, globals } => littlejoys::new(port, &globals).await,
    }
}
