pub mod create_user;
pub mod server;

// Single dispatch point for `Action`; extend the match in `run::execute` for new variants.
mod run;

#[derive(Debug)]
pub enum Action {
    Server(server::Args),
    CreateUser(create_user::Args),
}

impl Action {
    /// Execute the action.
    /// # Errors
    /// Returns an error if the action fails.
    pub async fn execute(self) -> anyhow::Result<()> {
        run::execute(self).await
    }
}
