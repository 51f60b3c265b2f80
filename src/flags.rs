use std::path::{Path, PathBuf};

xflags::xflags! {
    /// REST gateway for JSON-LD resources.
    cmd ldrest {
        /// Serve the API over HTTP.
        default cmd serve {
            /// TOML configuration file.
            optional -c,--config path: PathBuf
        }

        /// Handle one request event read from stdin and print the response
        /// envelope.
        cmd invoke {
            /// TOML configuration file.
            optional -c,--config path: PathBuf
        }
    }
}

impl Ldrest {
    pub(crate) fn config(&self) -> Option<&Path> {
        match &self.subcommand {
            LdrestCmd::Serve(serve) => serve.config.as_deref(),
            LdrestCmd::Invoke(invoke) => invoke.config.as_deref(),
        }
    }
}
