use crate::cli::actions::{Action, create_user, server};
use anyhow::Result;

/// Execute the provided action.
/// # Errors
/// Returns an error if the action fails.
pub async fn execute(action: Action) -> Result<()> {
    match action {
        Action::Server(args) => server::execute(args).await,
        Action::CreateUser(args) => create_user::execute(args).await,
    }
}
