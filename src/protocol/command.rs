#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Command {
    Ping,
    Resolve,
    ResolveMany,
    CacheReset,
    CacheInfo,
    Audit,
    FormatCurrency,
    FormatDate,
    Unknown,
}

impl From<&str> for Command {
    fn from(s: &str) -> Self {
        match s {
            "ping" => Command::Ping,
            "resolve" => Command::Resolve,
            "resolve_many" => Command::ResolveMany,
            "cache.reset" => Command::CacheReset,
            "cache.info" => Command::CacheInfo,
            "audit" => Command::Audit,
            "format.currency" => Command::FormatCurrency,
            "format.date" => Command::FormatDate,
            _ => Command::Unknown,
        }
    }
}
