//! DSO declarations of the current DSO list.

use std::collections::{BTreeMap, HashMap};

use crate::types::{Address, DsoRecord};

/// Maps derived from the `dso:` lines of one DSO list.
///
/// `name -> build id` and `load bias -> name` always change together: both
/// are cleared when a new list starts and both grow while a list continues.
///
/// ## Example
///
/// ```rust
/// use crashsym_core::dso::DsoRecords;
/// use crashsym_core::types::{Address, DsoRecord};
///
/// let mut records = DsoRecords::new();
/// records.insert(DsoRecord {
///     name: "libfoo.so".into(),
///     build_id: "abcd".into(),
///     load_bias: Address::new(0x2000),
/// });
/// let (bias, name) = records.nearest_below(Address::new(0x2050)).unwrap();
/// assert_eq!((bias, name), (Address::new(0x2000), "libfoo.so"));
/// ```
#[derive(Debug, Clone, Default)]
pub struct DsoRecords
{
    build_ids: HashMap<String, String>,
    names_by_bias: BTreeMap<Address, String>,
}

impl DsoRecords
{
    /// Create empty maps.
    #[must_use]
    pub fn new() -> Self
    {
        Self::default()
    }

    /// Add one declaration.
    ///
    /// A later declaration for the same name or bias replaces the earlier
    /// one.
    pub fn insert(&mut self, record: DsoRecord)
    {
        self.build_ids.insert(record.name.clone(), record.build_id);
        self.names_by_bias.insert(record.load_bias, record.name);
    }

    /// Drop both maps.
    pub fn clear(&mut self)
    {
        self.build_ids.clear();
        self.names_by_bias.clear();
    }

    /// `true` if no DSO is declared.
    pub fn is_empty(&self) -> bool
    {
        self.build_ids.is_empty() && self.names_by_bias.is_empty()
    }

    /// Number of declared DSOs.
    pub fn len(&self) -> usize
    {
        self.build_ids.len()
    }

    /// Build id declared for `name`.
    pub fn build_id(&self, name: &str) -> Option<&str>
    {
        self.build_ids.get(name).map(String::as_str)
    }

    /// The `name -> build id` map.
    pub fn build_ids(&self) -> &HashMap<String, String>
    {
        &self.build_ids
    }

    /// Load bias declared for `name`.
    pub fn bias_of(&self, name: &str) -> Option<Address>
    {
        self.names_by_bias
            .iter()
            .find(|(_, candidate)| candidate.as_str() == name)
            .map(|(bias, _)| *bias)
    }

    /// DSO loaded at the highest bias not above `address`.
    ///
    /// Biases are unique keys, so at most one candidate can win.
    pub fn nearest_below(&self, address: Address) -> Option<(Address, &str)>
    {
        self.names_by_bias
            .range(..=address)
            .next_back()
            .map(|(bias, name)| (*bias, name.as_str()))
    }
}

#[cfg(test)]
mod tests
{
    use super::*;

    fn record(name: &str, bias: u64) -> DsoRecord
    {
        DsoRecord {
            name: name.to_string(),
            build_id: format!("id-{name}"),
            load_bias: Address::new(bias),
        }
    }

    #[test]
    fn test_nearest_below()
    {
        let mut records = DsoRecords::new();
        records.insert(record("libbar.so", 0x1000));
        records.insert(record("libfoo.so", 0x2000));

        assert_eq!(records.nearest_below(Address::new(0x2050)), Some((Address::new(0x2000), "libfoo.so")));
        assert_eq!(records.nearest_below(Address::new(0x1fff)), Some((Address::new(0x1000), "libbar.so")));
        assert_eq!(records.nearest_below(Address::new(0x2000)), Some((Address::new(0x2000), "libfoo.so")));
        assert_eq!(records.nearest_below(Address::new(0xfff)), None);
    }

    #[test]
    fn test_clear_resets_both_maps()
    {
        let mut records = DsoRecords::new();
        records.insert(record("libc.so", 0x4000));
        assert_eq!(records.build_id("libc.so"), Some("id-libc.so"));
        assert_eq!(records.bias_of("libc.so"), Some(Address::new(0x4000)));

        records.clear();
        assert!(records.is_empty());
        assert_eq!(records.nearest_below(Address::new(0x5000)), None);
    }
}
