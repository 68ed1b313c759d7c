//! Token command handler

use jiff::Timestamp;

use crate::external::favor::{FavorClient, Token};

/// Handler for the token command
pub struct TokenCommandHandler<'a> {
    client: &'a FavorClient,
}

impl<'a> TokenCommandHandler<'a> {
    pub fn new(client: &'a FavorClient) -> Self {
        Self { client }
    }

    /// Acquire (or reuse) a guest token and print its expiry
    pub async fn execute(&self) -> anyhow::Result<()> {
        let token = self.client.ensure_valid_token().await?;
        println!("{}", render_token(&token, Timestamp::now()));
        Ok(())
    }
}

pub fn render_token(token: &Token, now: Timestamp) -> String {
    match token.expires_at() {
        Some(expires_at) => {
            let minutes = expires_at.duration_since(now).as_secs() / 60;
            format!("Guest token valid until {expires_at} ({minutes} min left)")
        }
        None => "Guest token acquired, expiry unknown".to_string(),
    }
}
