// SPDX-License-Identifier: AGPL-3.0-or-later
// Copyright (C) 2012-2025 Andrei Maltsev

use std::fmt;

/// Return code of a platform call (the kernel/IOKit `kern_return_t` family).
#[derive(Clone, Copy, PartialEq, Eq, Hash, Default)]
pub struct KernReturn(pub u32);

impl KernReturn {
    pub const SUCCESS: Self = Self(0x0000_0000);
    pub const ERROR: Self = Self(0xE000_02BC);
    pub const NO_MEMORY: Self = Self(0xE000_02BD);
    pub const NO_DEVICE: Self = Self(0xE000_02C0);
    pub const EXCLUSIVE_ACCESS: Self = Self(0xE000_02C5);
    pub const UNSUPPORTED: Self = Self(0xE000_02C7);
    pub const BUSY: Self = Self(0xE000_02D5);
    pub const NOT_PERMITTED: Self = Self(0xE000_02E2);
    pub const NOT_RESPONDING: Self = Self(0xE000_02ED);

    #[inline]
    pub const fn raw(self) -> u32 {
        self.0
    }

    #[inline]
    pub fn is_success(self) -> bool {
        self == Self::SUCCESS
    }

    /// `Ok(())` on success, the code itself otherwise.
    #[inline]
    pub fn into_result(self) -> Result<(), KernReturn> {
        if self.is_success() { Ok(()) } else { Err(self) }
    }
}

impl fmt::Debug for KernReturn {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "KernReturn(0x{:08x})", self.0)
    }
}

impl fmt::Display for KernReturn {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "0x{:08x}", self.0)
    }
}
