// Copyright (c) Microsoft Corporation.
// Licensed under the MIT license.

//==============================================================================
// Imports
//==============================================================================

use ::flexi_logger::Logger;
use ::std::sync::Once;

//==============================================================================
// Static Variables
//==============================================================================

/// Guardian to the logging initialize function.
static INIT_LOG: Once = Once::new();

//==============================================================================
// Standalone Functions
//==============================================================================

/// Initializes logging features.
///
/// The log specification is read from the `RUST_LOG` environment variable. Logging is off when it is unset.
pub fn initialize() {
    INIT_LOG.call_once(|| {
        let logger: Logger = match Logger::try_with_env_or_str("") {
            Ok(logger) => logger,
            Err(e) => {
                eprintln!("logging::initialize(): bad log specification ({:?})", e);
                return;
            },
        };
        // Dropping the handle shuts the logger down.
        match logger.start() {
            Ok(handle) => ::std::mem::forget(handle),
            Err(e) => eprintln!("logging::initialize(): failed to start logger ({:?})", e),
        }
    });
}
