pub mod geo;

pub use geo::*;

pub trait Named {
    fn name(&self) -> &str;
}

/// Anything that can be placed on the map.
pub trait Located {
    fn coordinate(&self) -> Coordinate;
}

/// Case-insensitive substring filter over names.
///
/// An empty needle keeps every entry, in order.
pub fn filter_by_name<'a, T>(needle: &str, haystack: &'a [T]) -> Vec<&'a T>
where
    T: Named,
{
    if needle.is_empty() {
        return haystack.iter().collect();
    }
    let normalized_needle = needle.to_lowercase();
    haystack
        .iter()
        .filter(|hay| hay.name().to_lowercase().contains(&normalized_needle))
        .collect()
}
