//! Declarative attribute schemas.
//!
//! A [`Schema`] is an ordered table of [`AttrDescriptor`]s. Netlink families
//! reuse numeric identifiers for different meanings depending on the
//! command (ipset's `PORT` and `PORT_FROM` are both type 4), so the table
//! is a list rather than a map, with two explicit lookups:
//!
//! - [`Schema::by_name`] is exact and is what encoding uses.
//! - [`Schema::by_id`] returns the first descriptor declared with that
//!   identifier and is what decoding uses.
//!
//! Schemas are plain `static` data. A descriptor can point at another
//! schema (or its own) through [`CodecKind::Nested`].
//!
//! ```ignore
//! static INNER_ATTRS: [AttrDescriptor; 1] = [AttrDescriptor::new(1, "VALUE", CodecKind::UInt8)];
//! static INNER: Schema = Schema::new("inner", &INNER_ATTRS);
//!
//! static OUTER_ATTRS: [AttrDescriptor; 2] = [
//!     AttrDescriptor::new(1, "NAME", CodecKind::AsciiZ(16)),
//!     AttrDescriptor::new(2, "INNER", CodecKind::Nested(&INNER)),
//! ];
//! static OUTER: Schema = Schema::new("outer", &OUTER_ATTRS);
//! ```

use std::fmt;

use super::codec::CodecKind;

/// One entry of a schema: identifier, symbolic name, payload codec.
#[derive(Debug, Clone, Copy)]
pub struct AttrDescriptor {
    /// Attribute type code (flag bits excluded).
    pub id: u16,
    /// Symbolic name.
    pub name: &'static str,
    /// Payload layout.
    pub codec: CodecKind,
}

impl AttrDescriptor {
    /// Create a descriptor.
    pub const fn new(id: u16, name: &'static str, codec: CodecKind) -> Self {
        Self { id, name, codec }
    }
}

/// Ordered attribute table.
pub struct Schema {
    name: &'static str,
    attrs: &'static [AttrDescriptor],
}

impl Schema {
    /// Create a schema from a descriptor table.
    pub const fn new(name: &'static str, attrs: &'static [AttrDescriptor]) -> Self {
        Self { name, attrs }
    }

    /// Schema name, for diagnostics.
    pub fn name(&self) -> &'static str {
        self.name
    }

    /// All descriptors in declaration order.
    pub fn descriptors(&self) -> &'static [AttrDescriptor] {
        self.attrs
    }

    /// Look up a descriptor by exact name.
    pub fn by_name(&self, name: &str) -> Option<&'static AttrDescriptor> {
        self.attrs.iter().find(|d| d.name == name)
    }

    /// Look up the first descriptor declared with `id`.
    pub fn by_id(&self, id: u16) -> Option<&'static AttrDescriptor> {
        self.attrs.iter().find(|d| d.id == id)
    }
}

impl fmt::Debug for Schema {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Schema")
            .field("name", &self.name)
            .field("attrs", &self.attrs.len())
            .finish()
    }
}
