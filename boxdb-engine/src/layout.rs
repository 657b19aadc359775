//! Storage names of tree nodes.

/// Storage name of a node: `t/` followed by the big-endian bytes of the id,
/// two hex digits per path segment.
///
/// ```rust
/// use boxdb_engine::layout::tree_file;
///
/// assert_eq!(tree_file(0), "t/00/00/00/00/00/00/00/00");
/// assert_eq!(tree_file(0x01ff), "t/00/00/00/00/00/00/01/ff");
/// ```
pub fn tree_file(node_id: u64) -> String {
    let mut name = String::with_capacity(2 + 8 * 3);
    name.push('t');
    for byte in node_id.to_be_bytes() {
        name.push('/');
        name.push_str(&format!("{:02x}", byte));
    }
    name
}
