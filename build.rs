use vergen::{BuildBuilder, CargoBuilder, Emitter};
use vergen_git2::Git2Builder;

// Feeds `newhorizon --version` with the build date and git revision.
fn main() -> Result<(), Box<dyn std::error::Error>> {
    let build = BuildBuilder::all_build()?;
    let cargo = CargoBuilder::all_cargo()?;

    let mut emitter = Emitter::default();
    emitter.add_instructions(&build)?.add_instructions(&cargo)?;

    // Source tarballs have no .git; fall back to placeholders instead of failing.
    match Git2Builder::default().sha(true).describe(true, true, None).build() {
        Ok(git2) => {
            emitter.add_instructions(&git2)?;
        }
        Err(_) => {
            println!("cargo:rustc-env=VERGEN_GIT_SHA=unknown");
            println!("cargo:rustc-env=VERGEN_GIT_DESCRIBE=unknown");
        }
    }

    emitter.emit()?;
    Ok(())
}
