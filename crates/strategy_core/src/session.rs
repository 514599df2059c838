//! Session domain (§4.6, glossary): the fixed set of trading-session
//! window names a `session` parameter may take, exact case.

use crate::errors::CoreError;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum Session {
    Sydney,
    Tokyo,
    London,
    NewYork,
    AsianKillZone,
    LondonOpenKillZone,
    NewYorkKillZone,
    LondonCloseKillZone,
}

impl Session {
    pub fn as_str(&self) -> &'static str {
        match self {
            Session::Sydney => "Sydney",
            Session::Tokyo => "Tokyo",
            Session::London => "London",
            Session::NewYork => "NewYork",
            Session::AsianKillZone => "AsianKillZone",
            Session::LondonOpenKillZone => "LondonOpenKillZone",
            Session::NewYorkKillZone => "NewYorkKillZone",
            Session::LondonCloseKillZone => "LondonCloseKillZone",
        }
    }
}

impl fmt::Display for Session {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Session {
    type Err = CoreError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Ok(match s {
            "Sydney" => Session::Sydney,
            "Tokyo" => Session::Tokyo,
            "London" => Session::London,
            "NewYork" => Session::NewYork,
            "AsianKillZone" => Session::AsianKillZone,
            "LondonOpenKillZone" => Session::LondonOpenKillZone,
            "NewYorkKillZone" => Session::NewYorkKillZone,
            "LondonCloseKillZone" => Session::LondonCloseKillZone,
            _ => return Err(CoreError::InvalidSession(s.to_string())),
        })
    }
}
