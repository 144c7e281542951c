//! Environment source: `GROOVEMATE_<SECTION>__<KEY>`, e.g.
//! `GROOVEMATE_TRANSPORT__MAX_ATTEMPTS=5`.

use config::builder::DefaultState;
use config::{ConfigBuilder, Environment};

pub fn add_to_builder(builder: ConfigBuilder<DefaultState>) -> ConfigBuilder<DefaultState> {
    builder.add_source(
        Environment::with_prefix("GROOVEMATE")
            .prefix_separator("_")
            .separator("__")
            .try_parsing(true),
    )
}
