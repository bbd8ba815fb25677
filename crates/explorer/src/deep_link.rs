use std::borrow::Cow;

/// Query parameter carrying the shareable selection.
pub const COUNTRY_PARAM: &str = "country";

fn decode_component(raw: &str) -> Cow<'_, str> {
    let spaced: Cow<'_, str> = if raw.contains('+') {
        Cow::Owned(raw.replace('+', " "))
    } else {
        Cow::Borrowed(raw)
    };
    match urlencoding::decode(&spaced) {
        Ok(decoded) => Cow::Owned(decoded.into_owned()),
        Err(_) => Cow::Owned(spaced.into_owned()),
    }
}

fn pairs(query: &str) -> impl Iterator<Item = &str> {
    query
        .strip_prefix('?')
        .unwrap_or(query)
        .split('&')
        .filter(|p| !p.is_empty())
}

fn is_country_pair(pair: &str) -> bool {
    let key = pair.split_once('=').map_or(pair, |(k, _)| k);
    decode_component(key) == COUNTRY_PARAM
}

/// Value of the `country` parameter in `query`, if present and non-blank.
///
/// Accepts an optional leading `?`. The first occurrence wins.
pub fn country_param(query: &str) -> Option<String> {
    pairs(query)
        .filter(|p| is_country_pair(p))
        .find_map(|pair| {
            let value = pair.split_once('=').map_or("", |(_, v)| v);
            let value = decode_component(value);
            let value = value.trim();
            (!value.is_empty()).then(|| value.to_string())
        })
}

/// Rewrites `query` so `country` is set to `id`, or removed when `id` is `None`.
///
/// Other parameters keep their order and raw encoding. The result has no
/// leading `?`.
pub fn with_country_param(query: &str, id: Option<&str>) -> String {
    let mut out: Vec<Cow<'_, str>> = pairs(query)
        .filter(|p| !is_country_pair(p))
        .map(Cow::Borrowed)
        .collect();
    if let Some(id) = id {
        out.push(Cow::Owned(format!(
            "{COUNTRY_PARAM}={}",
            urlencoding::encode(id)
        )));
    }
    out.join("&")
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LinkAction {
    /// Nothing to do: absent and already reset, or already processed.
    Ignore,
    /// The parameter disappeared; the memo was cleared.
    Reset,
    /// A country id that has not been processed yet.
    Apply(String),
}

/// Remembers the last `country` value acted on so URL echoes never loop.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct DeepLinkSync {
    last_processed: Option<String>,
}

impl DeepLinkSync {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn last_processed(&self) -> Option<&str> {
        self.last_processed.as_deref()
    }

    pub fn observe(&mut self, param: Option<&str>) -> LinkAction {
        match param {
            None => {
                if self.last_processed.take().is_some() {
                    LinkAction::Reset
                } else {
                    LinkAction::Ignore
                }
            }
            Some(id) if self.last_processed.as_deref() == Some(id) => LinkAction::Ignore,
            Some(id) => LinkAction::Apply(id.to_string()),
        }
    }

    pub fn mark_processed(&mut self, id: impl Into<String>) {
        self.last_processed = Some(id.into());
    }

    pub fn reset(&mut self) {
        self.last_processed = None;
    }
}
