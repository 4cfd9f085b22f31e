//! Ensures an artifact is present in the shared cache and prints its path.
//!
//! Configuration is read from `ARTIFACT_CACHE_*` environment variables parsed
//! by [`OrthoConfig`](https://github.com/leynos/ortho-config); log verbosity
//! follows `RUST_LOG`. The binary exits with status code `0` on success and
//! `1` on error.

fn main() -> color_eyre::eyre::Result<()> {
    artifact_cache::run().map_err(|err| color_eyre::eyre::eyre!(err))?;
    Ok(())
}
