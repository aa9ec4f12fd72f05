use caseless::Caseless;
use std::collections::BTreeMap;
use std::fmt;
use std::sync::OnceLock;
use std::time::Instant;
use unidecode::unidecode_char;

/// Highest Unicode code point; every table scan covers `0..=MAX_CODE_POINT`.
pub const MAX_CODE_POINT: u32 = 0x10FFFF;

/// Printable ASCII, the only keys the normalization table may carry.
const PRINTABLE_ASCII: std::ops::RangeInclusive<char> = ' '..='~';

static GLOBAL_TABLES: OnceLock<LookupTables> = OnceLock::new();

/// A mapping from one target character to the ordered list of source
/// characters that collapse to it under some transform.
///
/// Keys always iterate in ascending code point order. Value lists keep the
/// order in which the scan discovered them.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct LookupTable {
    entries: BTreeMap<char, Vec<char>>,
}

impl LookupTable {
    fn with_keys(keys: impl IntoIterator<Item = char>) -> Self {
        Self {
            entries: keys.into_iter().map(|key| (key, Vec::new())).collect(),
        }
    }

    fn push(&mut self, key: char, source: char) {
        self.entries.entry(key).or_default().push(source);
    }

    fn push_unique(&mut self, key: char, source: char) {
        let sources = self.entries.entry(key).or_default();
        if !sources.contains(&source) {
            sources.push(source);
        }
    }

    fn has_entries(&self, key: char) -> bool {
        self.entries.get(&key).is_some_and(|sources| !sources.is_empty())
    }

    pub fn get(&self, key: char) -> Option<&[char]> {
        self.entries.get(&key).map(Vec::as_slice)
    }

    /// Iterates over `(key, sources)` pairs in ascending key order.
    pub fn iter(&self) -> impl Iterator<Item = (char, &[char])> {
        self.entries
            .iter()
            .map(|(key, sources)| (*key, sources.as_slice()))
    }

    /// Number of keys, including keys whose source list is empty.
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Total number of source characters across all keys.
    pub fn entry_count(&self) -> usize {
        self.entries.values().map(Vec::len).sum()
    }

    /// Length of the longest source list.
    pub fn widest(&self) -> usize {
        self.entries.values().map(Vec::len).max().unwrap_or(0)
    }
}

impl FromIterator<(char, Vec<char>)> for LookupTable {
    fn from_iter<T: IntoIterator<Item = (char, Vec<char>)>>(iter: T) -> Self {
        Self {
            entries: iter.into_iter().collect(),
        }
    }
}

/// Identifies one of the three lookup tables.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum TableKind {
    Normalization,
    Truncation,
    CaseFold,
}

impl TableKind {
    pub const ALL: [TableKind; 3] = [
        TableKind::Normalization,
        TableKind::Truncation,
        TableKind::CaseFold,
    ];

    pub fn name(&self) -> &'static str {
        match self {
            TableKind::Normalization => "normalization",
            TableKind::Truncation => "truncation",
            TableKind::CaseFold => "case-fold",
        }
    }

    /// Runs the full code point scan for this table.
    pub fn build(&self) -> LookupTable {
        match self {
            TableKind::Normalization => build_normalization_table(),
            TableKind::Truncation => build_truncation_table(),
            TableKind::CaseFold => build_case_fold_table(),
        }
    }
}

impl fmt::Display for TableKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// Every Unicode scalar value, in ascending order. Surrogates are skipped.
fn scalar_values() -> impl Iterator<Item = char> {
    (0..=MAX_CODE_POINT).filter_map(char::from_u32)
}

/// Returns the only character an iterator yields, or `None` if it yields
/// zero or several.
fn single_char(mut chars: impl Iterator<Item = char>) -> Option<char> {
    let first = chars.next()?;
    chars.next().is_none().then_some(first)
}

/// Maps every printable ASCII character to the code points whose ASCII
/// transliteration is exactly that character.
pub fn build_normalization_table() -> LookupTable {
    let mut table = LookupTable::with_keys(PRINTABLE_ASCII);

    for c in scalar_values() {
        let Some(folded) = single_char(unidecode_char(c).chars()) else {
            continue;
        };
        if PRINTABLE_ASCII.contains(&folded) && folded != c {
            table.push(folded, c);
        }
    }
    table
}

/// Maps every single-byte character to the code points that share its low
/// eight bits.
pub fn build_truncation_table() -> LookupTable {
    let mut table = LookupTable::with_keys((0u8..=0xFF).map(char::from));

    for c in scalar_values() {
        let low = char::from((c as u32 & 0xFF) as u8);
        // Skips sources that are themselves populated keys.
        if low != c && !table.has_entries(c) {
            table.push(low, c);
        }
    }
    table
}

/// Maps each single-character result of uppercasing, lowercasing or full
/// case folding back to the code points that produce it.
pub fn build_case_fold_table() -> LookupTable {
    let mut table = LookupTable::default();

    for c in scalar_values() {
        let targets = [
            single_char(c.to_uppercase()),
            single_char(c.to_lowercase()),
            single_char(std::iter::once(c).default_case_fold()),
        ];
        for target in targets.into_iter().flatten() {
            if target != c {
                table.push_unique(target, c);
            }
        }
    }
    table
}

/// Build-once provider for the three lookup tables.
///
/// Each table is scanned the first time it is requested and then shared
/// immutably. Concurrent first requests block on a single build.
#[derive(Debug, Default)]
pub struct LookupTables {
    normalization: OnceLock<LookupTable>,
    truncation: OnceLock<LookupTable>,
    case_fold: OnceLock<LookupTable>,
}

impl LookupTables {
    pub fn new() -> Self {
        Self::default()
    }

    /// The process-wide provider.
    pub fn global() -> &'static LookupTables {
        GLOBAL_TABLES.get_or_init(LookupTables::new)
    }

    fn slot(&self, kind: TableKind) -> &OnceLock<LookupTable> {
        match kind {
            TableKind::Normalization => &self.normalization,
            TableKind::Truncation => &self.truncation,
            TableKind::CaseFold => &self.case_fold,
        }
    }

    pub fn get(&self, kind: TableKind) -> &LookupTable {
        self.slot(kind).get_or_init(|| build_logged(kind))
    }

    pub fn normalization(&self) -> &LookupTable {
        self.get(TableKind::Normalization)
    }

    pub fn truncation(&self) -> &LookupTable {
        self.get(TableKind::Truncation)
    }

    pub fn case_fold(&self) -> &LookupTable {
        self.get(TableKind::CaseFold)
    }

    pub fn is_built(&self, kind: TableKind) -> bool {
        self.slot(kind).get().is_some()
    }

    /// Builds every table that is not built yet, one worker thread per table.
    pub fn prebuild(&self) {
        std::thread::scope(|scope| {
            for kind in TableKind::ALL {
                if !self.is_built(kind) {
                    scope.spawn(move || {
                        self.get(kind);
                    });
                }
            }
        });
    }
}

fn build_logged(kind: TableKind) -> LookupTable {
    log::debug!("Scanning code points for the {kind} table");
    let started = Instant::now();
    let table = kind.build();
    log::info!(
        "Built {kind} table: {} keys, {} entries in {:.2?}",
        table.len(),
        table.entry_count(),
        started.elapsed()
    );
    table
}

#[cfg(test)]
mod tests {
    use super::*;

    fn tables() -> &'static LookupTables {
        LookupTables::global()
    }

    #[test]
    fn single_char_accepts_exactly_one() {
        assert_eq!(single_char("a".chars()), Some('a'));
        assert_eq!(single_char("".chars()), None);
        assert_eq!(single_char("ss".chars()), None);
    }

    #[test]
    fn scalar_values_skip_surrogates() {
        let count = scalar_values().count();
        assert_eq!(count, 0x110000 - 0x800);
        assert!(scalar_values().all(|c| !(0xD800..=0xDFFF).contains(&(c as u32))));
    }

    #[test]
    fn normalization_keys_are_printable_ascii() {
        let table = tables().normalization();
        assert_eq!(table.len(), 0x7F - 0x20);
        for (key, sources) in table.iter() {
            assert!(
                (0x20..=0x7E).contains(&(key as u32)),
                "Key {key:?} is outside printable ASCII"
            );
            assert!(
                !sources.contains(&key),
                "Key {key:?} lists itself as a source"
            );
        }
    }

    #[test]
    fn normalization_collapses_diacritics() {
        let table = tables().normalization();
        let a_sources = table.get('A').expect("'A' is always a key");
        assert!(a_sources.contains(&'\u{C0}'), "À should normalize to A");
        let e_sources = table.get('e').expect("'e' is always a key");
        assert!(e_sources.contains(&'\u{E9}'), "é should normalize to e");
        for (_, sources) in table.iter() {
            assert!(
                sources.windows(2).all(|w| w[0] < w[1]),
                "Sources should follow ascending scan order"
            );
        }
    }

    #[test]
    fn normalization_follows_unidecode_data() {
        let table = tables().normalization();
        assert_eq!(
            &table.get('.').expect("'.' is always a key")[..3],
            &['\u{2D1}', '\u{2D9}', '\u{55F}']
        );
        assert_eq!(
            &table.get('[').expect("'[' is always a key")[..3],
            &['\u{282A}', '\u{300C}', '\u{3014}']
        );
    }

    #[test]
    fn truncation_sources_share_low_byte() {
        let table = tables().truncation();
        assert_eq!(table.len(), 256);
        for (key, sources) in table.iter() {
            assert!((key as u32) <= 0xFF);
            for source in sources {
                assert_eq!(*source as u32 & 0xFF, key as u32);
                assert_ne!(*source, key);
            }
        }
    }

    #[test]
    fn truncation_lists_start_above_latin1() {
        let table = tables().truncation();
        let sources = table.get('A').expect("every byte is a key");
        assert_eq!(&sources[..2], &['\u{141}', '\u{241}']);
        let nul_sources = table.get('\0').expect("NUL is a key");
        assert_eq!(nul_sources[0], '\u{100}');
    }

    #[test]
    fn case_fold_keys_are_ascending_and_exclude_self() {
        let table = tables().case_fold();
        assert!(!table.is_empty());
        let keys: Vec<char> = table.iter().map(|(key, _)| key).collect();
        assert!(keys.windows(2).all(|w| w[0] < w[1]));
        for (key, sources) in table.iter() {
            assert!(!sources.contains(&key));
            let mut deduped = sources.to_vec();
            deduped.sort_unstable();
            deduped.dedup();
            assert_eq!(deduped.len(), sources.len(), "Duplicate sources under {key:?}");
        }
    }

    #[test]
    fn case_fold_covers_upper_lower_and_folding() {
        let table = tables().case_fold();
        let k_sources = table.get('k').expect("'k' has case variants");
        assert!(k_sources.contains(&'K'));
        assert!(k_sources.contains(&'\u{212A}'), "Kelvin sign lowercases to k");
        assert!(table.get('K').is_some_and(|s| s.contains(&'k')));
        let sharp_s = table.get('\u{DF}').expect("capital sharp s lowercases to ß");
        assert!(sharp_s.contains(&'\u{1E9E}'));
        // Final sigma folds to sigma.
        assert!(table.get('\u{3C3}').is_some_and(|s| s.contains(&'\u{3C2}')));
    }

    #[test]
    fn provider_builds_each_table_once() {
        let tables = LookupTables::new();
        assert!(!tables.is_built(TableKind::Truncation));
        let first: *const LookupTable = tables.truncation();
        assert!(tables.is_built(TableKind::Truncation));
        assert!(!tables.is_built(TableKind::CaseFold));
        let second: *const LookupTable = tables.get(TableKind::Truncation);
        assert!(std::ptr::eq(first, second));
    }

    #[test]
    fn prebuild_fills_every_slot() {
        let tables = LookupTables::new();
        tables.prebuild();
        for kind in TableKind::ALL {
            assert!(tables.is_built(kind), "{kind} table should be built");
        }
        assert_eq!(tables.normalization(), LookupTables::global().normalization());
    }

    #[test]
    fn lookup_table_counts() {
        let table: LookupTable = [('a', vec!['b', 'c']), ('d', vec![]), ('e', vec!['f'])]
            .into_iter()
            .collect();
        assert_eq!(table.len(), 3);
        assert_eq!(table.entry_count(), 3);
        assert_eq!(table.widest(), 2);
        assert_eq!(table.get('d'), Some(&[][..]));
        assert!(!table.has_entries('d'));
        assert_eq!(table.get('a'), Some(&['b', 'c'][..]));
        assert_eq!(table.get('z'), None);
    }
}
