//! CLI exit code registry.
//!
//! Single source of truth for exit codes. They are part of the shell
//! contract; scripts key off them, so never renumber an existing code.
//!
//! | Code | Meaning                                   |
//! |------|-------------------------------------------|
//! | 0    | Success                                   |
//! | 1    | General error (storage, output)           |
//! | 2    | Usage error (bad args, missing file)      |
//! | 3    | Invalid configuration                     |
//! | 4    | Duplicate result keys found               |
//! | 5    | Input parse error                         |

/// Success, command completed without errors.
pub const EXIT_SUCCESS: u8 = 0;

/// General error. Prefer a specific code where one exists.
pub const EXIT_ERROR: u8 = 1;

/// Usage error: bad arguments, unreadable file.
pub const EXIT_USAGE: u8 = 2;

/// Config failed to parse or validate.
pub const EXIT_CONFIG: u8 = 3;

/// Reconciliation ran but the result set has duplicate keys.
pub const EXIT_DUPLICATE: u8 = 4;

/// Input CSV failed to parse against its declared schema.
pub const EXIT_PARSE: u8 = 5;
