// src/fetch/urls.rs
use anyhow::{bail, Context, Result};
use std::{fmt, str::FromStr};
use url::Url;

pub const DEFAULT_BASE_URL: &str = "https://www.wahlrecht.de";

const FEDERAL_TOKEN: &str = "bund";
const FEDERAL_PAGE: &str = "/umfragen/laender.htm";
const STATE_PAGES: &str = "/umfragen/landtage/";

/// Which poll page to read: the nationwide overview or one state's page.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum Jurisdiction {
    Federal,
    State(String),
}

impl Jurisdiction {
    /// Tag written into every record, and the fallback `state`.
    pub fn slug(&self) -> &str {
        match self {
            Jurisdiction::Federal => FEDERAL_TOKEN,
            Jurisdiction::State(slug) => slug,
        }
    }

    pub fn page_path(&self) -> String {
        match self {
            Jurisdiction::Federal => FEDERAL_PAGE.to_string(),
            Jurisdiction::State(slug) => format!("{}{}.htm", STATE_PAGES, slug),
        }
    }

    pub fn page_url(&self, base: &Url) -> Result<Url> {
        let path = self.page_path();
        base.join(&path)
            .with_context(|| format!("building page url for {} from {}", path, base))
    }
}

impl FromStr for Jurisdiction {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self> {
        let slug = s.trim().to_lowercase();
        if slug.is_empty() {
            bail!("empty jurisdiction");
        }
        if !slug
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || c == '-' || c == '_')
        {
            bail!("invalid jurisdiction {:?}", s);
        }
        Ok(if slug == FEDERAL_TOKEN {
            Jurisdiction::Federal
        } else {
            Jurisdiction::State(slug)
        })
    }
}

impl fmt::Display for Jurisdiction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.slug())
    }
}
