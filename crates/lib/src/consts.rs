/// Default config file looked up in the current directory.
pub const CONFIG_FILE_NAME: &str = "cipherbuild.toml";

/// Environment variable overriding the workspace root.
pub const ROOT_ENV_VAR: &str = "CIPHERBUILD_ROOT";

/// Length of the truncated hash recorded in build markers.
pub const OBJ_HASH_PREFIX_LEN: usize = 20;

pub const DEFAULT_OPENSSL_VERSION: &str = "3.3.2";
pub const DEFAULT_OPENSSL_URL: &str = "https://www.openssl.org/source/openssl-{version}.tar.gz";

pub const DEFAULT_SQLCIPHER_URL: &str = "https://github.com/sqlcipher/sqlcipher.git";
pub const DEFAULT_SQLCIPHER_REV: &str = "v4.6.1";
pub const DEFAULT_SQLCIPHER_MAKEFILE: &str = "Makefile.msc";

pub const DEFAULT_LOCATOR: &str = r"C:\Program Files (x86)\Microsoft Visual Studio\Installer\vswhere.exe";
pub const DEFAULT_VERSION_RANGE: &str = "[16.0,18.0)";

/// Marker written into the dependency prefix after a successful install.
pub const BUILD_COMPLETE_MARKER: &str = ".cipherbuild-complete";
