//! User access permissions according to ISO 32000-2 Table 22

use bitflags::bitflags;

bitflags! {
    /// Operations granted to a user who opens the document with the user password
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
    pub struct Permissions: u32 {
        /// Print the document (bit 3)
        const PRINT = 1 << 2;
        /// Modify document contents (bit 4)
        const MODIFY_CONTENTS = 1 << 3;
        /// Copy text and graphics (bit 5)
        const COPY = 1 << 4;
        /// Add or modify annotations (bit 6)
        const MODIFY_ANNOTATIONS = 1 << 5;
        /// Fill in form fields (bit 9)
        const FILL_FORMS = 1 << 8;
        /// Extract content for accessibility (bit 10)
        const ACCESSIBILITY = 1 << 9;
        /// Insert, rotate and delete pages (bit 11)
        const ASSEMBLE = 1 << 10;
        /// Print at full quality (bit 12)
        const PRINT_HIGH_QUALITY = 1 << 11;
    }
}

impl Permissions {
    /// Bits 7-8 and 13-32 must be set in `/P`
    const RESERVED_BITS: u32 = 0xFFFF_F0C0;

    /// Signed value stored in the `/P` entry
    pub fn p_value(self) -> i32 {
        (self.bits() | Self::RESERVED_BITS) as i32
    }

    /// Permissions encoded in a `/P` value; reserved bits are ignored
    pub fn from_p_value(p: i32) -> Self {
        Self::from_bits_truncate(p as u32)
    }
}

impl Default for Permissions {
    fn default() -> Self {
        Permissions::all()
    }
}
