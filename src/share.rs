//! Social-share links for the host client's cast composer.

use crate::debug::{self, cat};

pub const COMPOSE_URL: &str = "https://warpcast.com/~/compose";

/// The composer accepts at most this many embeds.
pub const MAX_EMBEDS: usize = 2;

/// Build a compose link with `text` and up to [`MAX_EMBEDS`] embed URLs.
pub fn compose_url(text: &str, embeds: &[&str]) -> String {
    let mut url = format!("{COMPOSE_URL}?text={}", urlencoding::encode(text));
    for embed in embeds.iter().filter(|e| !e.is_empty()).take(MAX_EMBEDS) {
        url.push_str("&embeds[]=");
        url.push_str(&urlencoding::encode(embed));
    }
    debug::log(cat::SHARE, format!("compose {url}"));
    url
}

/// Public page for one pet, used as the cast embed.
pub fn token_page_url(app_url: &str, token_id: u64) -> String {
    format!("{}/pet/{token_id}", app_url.trim_end_matches('/'))
}

pub fn pet_share_text(name: Option<&str>, token_id: u64) -> String {
    match name.map(str::trim).filter(|n| !n.is_empty()) {
        Some(name) => format!("Meet {name}, my pet #{token_id}! Adopt yours:"),
        None => format!("Meet my pet #{token_id}! Adopt yours:"),
    }
}

/// Compose link for sharing one pet: default text plus the pet's page.
pub fn share_pet_url(app_url: &str, token_id: u64, name: Option<&str>) -> String {
    let page = token_page_url(app_url, token_id);
    compose_url(&pet_share_text(name, token_id), &[&page])
}
