//! Image relocation via the `skopeo` command-line tool.
//!
//! Copies an image from its source registry into the configured push
//! registry. The copy is synchronous within the calling worker and is not
//! cancellable once started.

use std::env;

use async_trait::async_trait;
use tokio::process::Command;
use tracing::{debug, info};

use buildwatch_core::config::RegistryConfig;
use buildwatch_core::ImageReference;

use crate::error::SubmitError;
use crate::traits::ImageRelocator;

const DEFAULT_SKOPEO: &str = "skopeo";

/// Relocates images by shelling out to `skopeo copy`.
pub struct SkopeoRelocator {
    skopeo_path: String,
    push_registry: String,
    user: Option<String>,
    password: Option<String>,
    src_verify_tls: bool,
    dst_verify_tls: bool,
}

impl SkopeoRelocator {
    /// Configure a relocator targeting `push_registry`.
    ///
    /// The skopeo binary is resolved from `SKOPEO_PATH` when set.
    pub fn new(push_registry: String, registry: &RegistryConfig) -> Self {
        Self {
            skopeo_path: env::var("SKOPEO_PATH").unwrap_or_else(|_| DEFAULT_SKOPEO.to_string()),
            push_registry,
            user: registry.user.clone(),
            password: registry.password.clone(),
            src_verify_tls: registry.src_verify_tls,
            dst_verify_tls: registry.dst_verify_tls,
        }
    }

    fn copy_args(&self, src: &ImageReference, dest: &ImageReference) -> Vec<String> {
        let mut args = vec!["copy".to_string()];

        if !self.src_verify_tls {
            args.push("--src-tls-verify=false".to_string());
        }
        if !self.dst_verify_tls {
            args.push("--dest-tls-verify=false".to_string());
        }

        // Credentials apply to the destination side of the copy only.
        if let Some(user) = &self.user {
            let creds = match &self.password {
                Some(password) => format!("{user}:{password}"),
                None => user.clone(),
            };
            args.push(format!("--dest-creds={creds}"));
        }

        args.push(format!("docker://{src}"));
        args.push(format!("docker://{dest}"));
        args
    }

    /// Render the command for diagnostics with the password blanked out.
    fn redacted_command(&self, args: &[String]) -> String {
        let mut rendered = format!("{} {}", self.skopeo_path, args.join(" "));
        if let Some(password) = &self.password {
            if !password.is_empty() {
                rendered = rendered.replace(password.as_str(), "***");
            }
        }
        rendered
    }
}

#[async_trait]
impl ImageRelocator for SkopeoRelocator {
    async fn relocate(&self, image: &ImageReference) -> Result<ImageReference, SubmitError> {
        let dest = image.relocated(&self.push_registry);
        let args = self.copy_args(image, &dest);
        debug!(command = %self.redacted_command(&args), "running skopeo copy");

        let output = Command::new(&self.skopeo_path)
            .args(&args)
            .output()
            .await
            .map_err(|e| SubmitError::Spawn(e.to_string()))?;

        let stdout = String::from_utf8_lossy(&output.stdout);
        let stderr = String::from_utf8_lossy(&output.stderr);
        debug!(stdout = %stdout, stderr = %stderr, "skopeo finished");

        if !output.status.success() {
            return Err(SubmitError::Copy {
                code: output.status.code(),
                stderr: stderr.trim().to_string(),
            });
        }

        info!(src = %image, dest = %dest, "image copied to push registry");
        Ok(dest)
    }
}
