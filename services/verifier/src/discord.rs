//! Discord REST collaborator: implements the chat-host seam over the
//! v10 HTTP API. No gateway connection is held; every call is a plain
//! authenticated request.

use async_trait::async_trait;
use reqwest::header::AUTHORIZATION;
use rollcall_core::{Channel, ChatHost, Error, Member, Result, Role};
use serde::de::DeserializeOwned;
use serde::Deserialize;

const API_BASE: &str = "https://discord.com/api/v10";

/// Members fetched per roster listing request.
const MEMBER_PAGE_LIMIT: u32 = 1000;

pub struct DiscordClient {
    http: reqwest::Client,
    token: String,
    guild_id: String,
}

#[derive(Debug, Deserialize)]
struct GuildMember {
    user: DiscordUser,
}

#[derive(Debug, Deserialize)]
struct DiscordUser {
    id: String,
    username: String,
    #[serde(default)]
    discriminator: String,
}

impl DiscordUser {
    /// Display handle: `username#discriminator`, or the bare username
    /// for accounts migrated off discriminators.
    fn handle(&self) -> String {
        if self.discriminator.is_empty() || self.discriminator == "0" {
            self.username.clone()
        } else {
            format!("{}#{}", self.username, self.discriminator)
        }
    }
}

#[derive(Debug, Deserialize)]
struct GuildRole {
    id: String,
    name: String,
}

#[derive(Debug, Deserialize)]
struct GuildChannel {
    id: String,
    #[serde(default)]
    name: String,
}

impl DiscordClient {
    pub fn new(token: impl Into<String>, guild_id: impl Into<String>) -> Self {
        Self {
            http: reqwest::Client::new(),
            token: token.into(),
            guild_id: guild_id.into(),
        }
    }

    fn auth(&self) -> String {
        format!("Bot {}", self.token)
    }

    async fn get_json<T: DeserializeOwned>(&self, url: String) -> Result<T> {
        self.http
            .get(&url)
            .header(AUTHORIZATION, self.auth())
            .send()
            .await
            .map_err(|e| Error::ChatPlatform(e.to_string()))?
            .error_for_status()
            .map_err(|e| Error::ChatPlatform(e.to_string()))?
            .json()
            .await
            .map_err(|e| Error::ChatPlatform(e.to_string()))
    }
}

#[async_trait]
impl ChatHost for DiscordClient {
    async fn list_members(&self) -> Result<Vec<Member>> {
        let members: Vec<GuildMember> = self
            .get_json(format!(
                "{API_BASE}/guilds/{}/members?limit={MEMBER_PAGE_LIMIT}",
                self.guild_id
            ))
            .await?;
        Ok(members
            .into_iter()
            .map(|m| Member {
                id: m.user.id.clone(),
                handle: m.user.handle(),
            })
            .collect())
    }

    async fn list_roles(&self) -> Result<Vec<Role>> {
        let roles: Vec<GuildRole> = self
            .get_json(format!("{API_BASE}/guilds/{}/roles", self.guild_id))
            .await?;
        Ok(roles
            .into_iter()
            .map(|r| Role {
                id: r.id,
                name: r.name,
            })
            .collect())
    }

    async fn list_channels(&self) -> Result<Vec<Channel>> {
        let channels: Vec<GuildChannel> = self
            .get_json(format!("{API_BASE}/guilds/{}/channels", self.guild_id))
            .await?;
        Ok(channels
            .into_iter()
            .map(|c| Channel {
                id: c.id,
                name: c.name,
            })
            .collect())
    }

    async fn grant_role(&self, member_id: &str, role_id: &str) -> Result<()> {
        self.http
            .put(format!(
                "{API_BASE}/guilds/{}/members/{member_id}/roles/{role_id}",
                self.guild_id
            ))
            .header(AUTHORIZATION, self.auth())
            .send()
            .await
            .map_err(|e| Error::ChatPlatform(e.to_string()))?
            .error_for_status()
            .map_err(|e| Error::ChatPlatform(e.to_string()))?;
        Ok(())
    }

    async fn send_message(&self, channel_id: &str, content: &str) -> Result<()> {
        self.http
            .post(format!("{API_BASE}/channels/{channel_id}/messages"))
            .header(AUTHORIZATION, self.auth())
            .json(&serde_json::json!({ "content": content }))
            .send()
            .await
            .map_err(|e| Error::ChatPlatform(e.to_string()))?
            .error_for_status()
            .map_err(|e| Error::ChatPlatform(e.to_string()))?;
        Ok(())
    }
}
