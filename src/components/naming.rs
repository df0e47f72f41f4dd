use std::collections::BTreeMap;

/// Resolves an entity name.  A name ending in a period is numbered from 0
/// (`car.` gives `car.0`, `car.1`, ...), and a name ending in a comma is
/// numbered from 1 (`car,` gives `car.1`, `car.2`, ...).  Other names are
/// used as they are.
pub(crate) fn resolve_name(counters: &mut BTreeMap<String, usize>, name: &str) -> String {
    let (stem, first) = if let Some(stem) = name.strip_suffix('.') {
        (stem, 0)
    } else if let Some(stem) = name.strip_suffix(',') {
        (stem, 1)
    } else {
        return name.to_string();
    };
    let counter = counters.entry(name.to_string()).or_insert(first);
    let resolved = format!("{}.{}", stem, counter);
    *counter += 1;
    resolved
}

/// The default name of a component, derived from its process type.
pub(crate) fn default_name(process_type: &str) -> String {
    format!("{}.", process_type.to_lowercase())
}
