use catalog::{Catalog, CountryRecord};
use unicode_normalization::UnicodeNormalization;
use unicode_normalization::char::is_combining_mark;

/// Canonical decomposition, combining marks dropped, lowercased.
///
/// `"São Tomé"` and `"sao tome"` normalize to the same string.
pub fn normalize_text(s: &str) -> String {
    s.nfd()
        .filter(|c| !is_combining_mark(*c))
        .flat_map(char::to_lowercase)
        .collect()
}

/// Pre-normalized name and capital for every catalog record, by position.
#[derive(Debug, Clone, Default)]
pub struct SearchIndex {
    keys: Vec<(String, String)>,
}

impl SearchIndex {
    pub fn new(catalog: &Catalog) -> Self {
        let keys = catalog
            .records()
            .iter()
            .map(|r| (normalize_text(&r.name), normalize_text(&r.capital)))
            .collect();
        Self { keys }
    }

    pub fn len(&self) -> usize {
        self.keys.len()
    }

    pub fn is_empty(&self) -> bool {
        self.keys.is_empty()
    }

    /// Catalog positions whose name or capital contains `query`, in catalog
    /// order, at most `limit` of them. A blank query matches nothing.
    pub fn query(&self, query: &str, limit: usize) -> Vec<usize> {
        let needle = normalize_text(query.trim());
        if needle.is_empty() {
            return Vec::new();
        }
        self.keys
            .iter()
            .enumerate()
            .filter(|(_, (name, capital))| name.contains(&needle) || capital.contains(&needle))
            .map(|(pos, _)| pos)
            .take(limit)
            .collect()
    }
}

#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub enum SearchKey {
    ArrowDown,
    ArrowUp,
    Enter,
    Escape,
}

#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub enum KeyOutcome {
    Nothing,
    Moved(isize),
    /// Catalog position of the record to select.
    Select(usize),
    Cleared,
}

#[derive(Debug, Clone, PartialEq)]
pub struct SearchRow<'a> {
    pub position: usize,
    pub record: &'a CountryRecord,
    pub highlighted: bool,
}

/// Query text, results and keyboard highlight.
///
/// `highlighted` is `-1` when nothing is highlighted and never leaves
/// `-1..results.len()`.
#[derive(Debug, Clone, PartialEq)]
pub struct SearchState {
    query: String,
    results: Vec<usize>,
    highlighted: isize,
}

impl Default for SearchState {
    fn default() -> Self {
        Self {
            query: String::new(),
            results: Vec::new(),
            highlighted: -1,
        }
    }
}

impl SearchState {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn query(&self) -> &str {
        &self.query
    }

    pub fn results(&self) -> &[usize] {
        &self.results
    }

    pub fn highlighted(&self) -> isize {
        self.highlighted
    }

    /// Recomputes results synchronously and drops the highlight.
    pub fn set_query(&mut self, index: &SearchIndex, query: &str, limit: usize) {
        self.query = query.to_string();
        self.results = index.query(query, limit);
        self.highlighted = -1;
    }

    pub fn clear(&mut self) {
        *self = Self::default();
    }

    pub fn handle_key(&mut self, key: SearchKey) -> KeyOutcome {
        match key {
            SearchKey::ArrowDown => {
                if self.results.is_empty() {
                    return KeyOutcome::Nothing;
                }
                let last = self.results.len() as isize - 1;
                self.highlighted = (self.highlighted + 1).min(last);
                KeyOutcome::Moved(self.highlighted)
            }
            SearchKey::ArrowUp => {
                if self.results.is_empty() {
                    return KeyOutcome::Nothing;
                }
                self.highlighted = (self.highlighted - 1).max(-1);
                KeyOutcome::Moved(self.highlighted)
            }
            SearchKey::Enter => {
                let pick = usize::try_from(self.highlighted)
                    .ok()
                    .and_then(|h| self.results.get(h))
                    .or_else(|| self.results.first());
                match pick {
                    Some(&pos) => KeyOutcome::Select(pos),
                    None => KeyOutcome::Nothing,
                }
            }
            SearchKey::Escape => {
                self.clear();
                KeyOutcome::Cleared
            }
        }
    }

    pub fn rows<'a>(&self, catalog: &'a Catalog) -> Vec<SearchRow<'a>> {
        self.results
            .iter()
            .enumerate()
            .filter_map(|(i, &position)| {
                catalog.record(position).map(|record| SearchRow {
                    position,
                    record,
                    highlighted: i as isize == self.highlighted,
                })
            })
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::{KeyOutcome, SearchIndex, SearchKey, SearchState, normalize_text};
    use catalog::Catalog;
    use pretty_assertions::assert_eq;

    fn builtin() -> Catalog {
        Catalog::builtin().unwrap()
    }

    fn names(catalog: &Catalog, positions: &[usize]) -> Vec<String> {
        positions
            .iter()
            .map(|&p| catalog.record(p).unwrap().name.clone())
            .collect()
    }

    #[test]
    fn normalization_strips_diacritics_and_case() {
        assert_eq!(normalize_text("São Paulo"), normalize_text("Sao Paulo"));
        assert_eq!(normalize_text("Reykjavík"), "reykjavik");
        assert_eq!(normalize_text("CÔTE D'IVOIRE"), "cote d'ivoire");
    }

    #[test]
    fn matches_name_or_capital_without_accents() {
        let catalog = builtin();
        let index = SearchIndex::new(&catalog);

        let hits = index.query("sao", 20);
        assert!(names(&catalog, &hits).contains(&"São Tomé and Príncipe".to_string()));

        let by_capital = index.query("TOKYO", 20);
        assert_eq!(names(&catalog, &by_capital), vec!["Japan".to_string()]);

        assert!(index.query("   ", 20).is_empty());
    }

    #[test]
    fn results_keep_catalog_order_and_cap() {
        let catalog = builtin();
        let index = SearchIndex::new(&catalog);
        let hits = index.query("a", 20);
        assert_eq!(hits.len(), 20);
        assert!(hits.windows(2).all(|w| w[0] < w[1]));
        assert_eq!(index.query("a", 3).len(), 3);
    }

    #[test]
    fn keyboard_navigation_clamps() {
        let catalog = builtin();
        let index = SearchIndex::new(&catalog);
        let mut state = SearchState::new();
        state.set_query(&index, "ia", 20);
        let n = state.results().len() as isize;
        assert!(n >= 2);
        assert_eq!(state.highlighted(), -1);

        assert_eq!(state.handle_key(SearchKey::ArrowUp), KeyOutcome::Moved(-1));
        for _ in 0..n + 3 {
            state.handle_key(SearchKey::ArrowDown);
        }
        assert_eq!(state.highlighted(), n - 1);
        assert_eq!(
            state.handle_key(SearchKey::Enter),
            KeyOutcome::Select(state.results()[(n - 1) as usize])
        );

        state.handle_key(SearchKey::ArrowUp);
        assert_eq!(state.highlighted(), n - 2);

        state.set_query(&index, "ind", 20);
        assert_eq!(state.highlighted(), -1);
    }

    #[test]
    fn enter_without_highlight_takes_first() {
        let catalog = builtin();
        let index = SearchIndex::new(&catalog);
        let mut state = SearchState::new();
        state.set_query(&index, "land", 20);
        let first = state.results()[0];
        assert_eq!(state.handle_key(SearchKey::Enter), KeyOutcome::Select(first));

        state.set_query(&index, "zzzz", 20);
        assert_eq!(state.handle_key(SearchKey::Enter), KeyOutcome::Nothing);
        assert_eq!(state.handle_key(SearchKey::ArrowDown), KeyOutcome::Nothing);
    }

    #[test]
    fn escape_clears_everything() {
        let catalog = builtin();
        let index = SearchIndex::new(&catalog);
        let mut state = SearchState::new();
        state.set_query(&index, "an", 20);
        state.handle_key(SearchKey::ArrowDown);
        assert_eq!(state.handle_key(SearchKey::Escape), KeyOutcome::Cleared);
        assert_eq!(state, SearchState::new());
    }

    #[test]
    fn rows_mark_highlight() {
        let catalog = builtin();
        let index = SearchIndex::new(&catalog);
        let mut state = SearchState::new();
        state.set_query(&index, "an", 20);
        state.handle_key(SearchKey::ArrowDown);
        let rows = state.rows(&catalog);
        assert_eq!(rows.len(), state.results().len());
        assert!(rows[0].highlighted);
        assert!(rows.iter().skip(1).all(|r| !r.highlighted));
    }
}
