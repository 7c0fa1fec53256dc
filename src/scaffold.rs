//! Template scaffolding for components
//!
//! Creating a component produces a starter template keyed by its handle;
//! deleting the component removes it again.

use std::path::{Path, PathBuf};
use crate::Result;
use crate::component::Component;

/// Produces and removes per-component template artifacts
pub trait Scaffolder {
    /// Create the artifact for a new component. Returns its path when one was written.
    fn create(&self, component: &Component) -> Result<Option<PathBuf>>;

    /// Remove the artifact of a component, if present
    fn remove(&self, handle: &str) -> Result<()>;

    /// Follow a handle change
    fn rename(&self, _from: &str, _to: &str) -> Result<()> {
        Ok(())
    }
}

/// Scaffolder that does nothing
#[derive(Debug, Clone, Copy, Default)]
pub struct NoopScaffolder;

impl Scaffolder for NoopScaffolder {
    fn create(&self, _component: &Component) -> Result<Option<PathBuf>> {
        Ok(None)
    }

    fn remove(&self, _handle: &str) -> Result<()> {
        Ok(())
    }
}

/// Writes `component-<handle>.html` templates into a directory
#[derive(Debug, Clone)]
pub struct FsScaffolder {
    dir: PathBuf,
}

impl FsScaffolder {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    /// Path of the template for a handle
    pub fn template_path(&self, handle: &str) -> PathBuf {
        self.dir.join(format!("component-{}.html", handle))
    }
}

impl Scaffolder for FsScaffolder {
    fn create(&self, component: &Component) -> Result<Option<PathBuf>> {
        let path = self.template_path(&component.handle);
        if path.exists() {
            tracing::debug!("Template {} already exists, leaving it alone", path.display());
            return Ok(None);
        }

        std::fs::create_dir_all(&self.dir)?;
        std::fs::write(&path, starter_template(component))?;
        tracing::info!("Scaffolded {}", path.display());
        Ok(Some(path))
    }

    fn remove(&self, handle: &str) -> Result<()> {
        let path = self.template_path(handle);
        if path.exists() {
            std::fs::remove_file(&path)?;
            tracing::info!("Removed {}", path.display());
        }
        Ok(())
    }

    fn rename(&self, from: &str, to: &str) -> Result<()> {
        let old = self.template_path(from);
        let new = self.template_path(to);
        if old.exists() && !new.exists() {
            std::fs::rename(&old, &new)?;
        }
        Ok(())
    }
}

fn starter_template(component: &Component) -> String {
    let mut out = format!("<!-- Component: {} ({}) -->\n", component.name, component.handle);
    if let Some(instruction) = &component.instruction {
        out.push_str(&format!("<!-- {} -->\n", instruction.replace("--", "- -")));
    }
    out.push_str(&format!(
        "<section class=\"component component-{}\">\n</section>\n",
        component.handle
    ));
    out
}
