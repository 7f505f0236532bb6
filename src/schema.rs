/// Column-name constants shared by every pipeline stage.

// ── Survey table columns ────────────────────────────────────────────────────
pub mod table {
    pub const DATE: &str = "Date";
    /// 1-based sheet row a raw survey row was read from.
    pub const SOURCE_ROW: &str = "source_row";
}

// ── Yearly aggregate columns ────────────────────────────────────────────────
pub mod yearly {
    pub const YEAR: &str = "year";
    pub const COUNT: &str = "count";
}

// ── Header cell conventions ─────────────────────────────────────────────────
pub mod header {
    pub const UNSPECIFIED_TITLE: &str = "Unspecified Phylum";
    pub const UNNAMED_PREFIX: &str = "Unnamed: ";
    /// Characters rejected by common file systems.
    pub const ILLEGAL_FILENAME_CHARS: &[char] = &['\\', '/', ':', '*', '"', '<', '>', '|', '.'];
}
