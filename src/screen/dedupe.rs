use crate::screen::screen_model::ElementDescriptor;

/// Whether `candidate` repeats a descriptor already in `existing`.
///
/// Compares (identifier, text, class) only. Bounds and state flags are left
/// out: a re-layout between query passes moves a node without making it a
/// different element. Linear scan; per-kind lists stay in the tens.
pub fn is_duplicate(existing: &[ElementDescriptor], candidate: &ElementDescriptor) -> bool {
    let key = candidate.structural_key();
    existing.iter().any(|d| d.structural_key() == key)
}

/// Append `candidate` unless it is a duplicate. Returns whether it was kept.
pub fn push_unique(list: &mut Vec<ElementDescriptor>, candidate: ElementDescriptor) -> bool {
    if is_duplicate(list, &candidate) {
        return false;
    }
    list.push(candidate);
    true
}
