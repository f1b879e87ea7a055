//! Git repository fixtures
//!
//! Real repositories created with `git2`, for tests that exercise the
//! dispatch of `git-upload-pack`/`git-receive-pack` against something
//! clonable.

use std::fs;
use std::path::Path;

use git2::{Repository, Signature};

/// Initialise a bare repository, ready to be pushed into.
pub fn bare_repo(path: &Path) -> Repository {
    Repository::init_bare(path).expect("git fixture: failed to init bare repository")
}

/// Initialise a repository containing one committed README.
pub fn seeded_repo(path: &Path) -> Repository {
    let repo = Repository::init(path).expect("git fixture: failed to init repository");

    fs::write(path.join("README"), "test fixture\n").expect("git fixture: failed to write README");

    let tree_id = {
        let mut index = repo.index().expect("git fixture: failed to open index");
        index
            .add_path(Path::new("README"))
            .expect("git fixture: failed to stage README");
        index.write().expect("git fixture: failed to write index");
        index
            .write_tree()
            .expect("git fixture: failed to write tree")
    };

    {
        let tree = repo
            .find_tree(tree_id)
            .expect("git fixture: failed to find tree");
        let signature = Signature::now("fixture", "fixture@example.invalid")
            .expect("git fixture: failed to build signature");
        repo.commit(Some("HEAD"), &signature, &signature, "initial", &tree, &[])
            .expect("git fixture: failed to commit");
    }

    repo
}
