use std::time::Duration;

pub const APP_NAME: &str = "hotfn";

/// Default project file name, looked up in the current directory.
pub const PROJECT_FILE: &str = "hotfn.yml";

/// Directory written by the synthesis step; holds the template and the asset staging area.
pub const SYNTH_OUT_DIR: &str = "cdk.out";

/// Prefix of per-function staging directories inside [`SYNTH_OUT_DIR`].
pub const ASSET_DIR_PREFIX: &str = "asset.";

/// Local parameters file handed to the gateway emulator.
pub const ENV_FILE: &str = "env.json";

/// Fixed name of the executable produced by compiled-source builds.
pub const BOOTSTRAP_BINARY: &str = "bootstrap";

pub const DEFAULT_GATEWAY_PORT: u16 = 3000;
pub const DEFAULT_GATEWAY_PROGRAM: &str = "sam";
pub const DEFAULT_DEBOUNCE: Duration = Duration::from_millis(800);
pub const DEFAULT_STARTUP_GRACE: Duration = Duration::from_secs(2);
