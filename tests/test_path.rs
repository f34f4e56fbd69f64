use std::fs;

use static_httpd::http::path::{PathResolver, ResolveError};

fn site() -> (tempfile::TempDir, PathResolver) {
    let dir = tempfile::tempdir().unwrap();
    let root = dir.path().join("files");
    fs::create_dir_all(root.join("foo")).unwrap();
    fs::write(root.join("helloworld.html"), "<h1>hello</h1>").unwrap();
    fs::write(root.join("foo").join("doc.pdf"), "%PDF").unwrap();
    fs::write(dir.path().join("secret.txt"), "secret").unwrap();

    let resolver = PathResolver::new(&root).unwrap();
    (dir, resolver)
}

#[test]
fn test_resolve_inside_root() {
    let (_dir, resolver) = site();

    let path = resolver.resolve("/helloworld.html").unwrap();
    assert!(path.starts_with(resolver.root()));
    assert_eq!(path, resolver.root().join("helloworld.html"));

    let nested = resolver.resolve("/foo/doc.pdf").unwrap();
    assert_eq!(nested, resolver.root().join("foo").join("doc.pdf"));
}

#[test]
fn test_resolve_discards_query_and_fragment() {
    let (_dir, resolver) = site();

    let path = resolver.resolve("/helloworld.html?x=1#top").unwrap();
    assert_eq!(path, resolver.root().join("helloworld.html"));
}

#[test]
fn test_resolve_dot_segments_within_root() {
    let (_dir, resolver) = site();

    let path = resolver.resolve("/foo/../helloworld.html").unwrap();
    assert_eq!(path, resolver.root().join("helloworld.html"));

    let path = resolver.resolve("/./foo/./doc.pdf").unwrap();
    assert_eq!(path, resolver.root().join("foo").join("doc.pdf"));
}

#[test]
fn test_resolve_percent_decoded() {
    let (_dir, resolver) = site();
    fs::write(resolver.root().join("with space.txt"), "x").unwrap();

    let path = resolver.resolve("/with%20space.txt").unwrap();
    assert_eq!(path, resolver.root().join("with space.txt"));
}

#[test]
fn test_resolve_missing_file_stays_in_root() {
    let (_dir, resolver) = site();

    let path = resolver.resolve("/missing.html").unwrap();
    assert_eq!(path, resolver.root().join("missing.html"));
    assert!(!path.exists());
}

#[test]
fn test_resolve_rejects_escape() {
    let (_dir, resolver) = site();

    for target in [
        "/../secret.txt",
        "/../../etc/passwd",
        "/foo/../../secret.txt",
        "/%2e%2e/secret.txt",
        "/..%2fsecret.txt",
        "/..",
    ] {
        assert!(
            matches!(resolver.resolve(target), Err(ResolveError::PathEscape(_))),
            "{target}"
        );
    }
}

#[cfg(unix)]
#[test]
fn test_resolve_rejects_symlink_out_of_root() {
    let (dir, resolver) = site();
    std::os::unix::fs::symlink(dir.path().join("secret.txt"), resolver.root().join("link.txt"))
        .unwrap();

    assert!(matches!(
        resolver.resolve("/link.txt"),
        Err(ResolveError::PathEscape(_))
    ));
}

#[cfg(unix)]
#[test]
fn test_resolve_rejects_missing_file_under_symlinked_dir() {
    let (dir, resolver) = site();
    let outside = dir.path().join("outside");
    fs::create_dir(&outside).unwrap();
    fs::write(outside.join("exists.txt"), "x").unwrap();
    std::os::unix::fs::symlink(&outside, resolver.root().join("out")).unwrap();

    for target in ["/out/exists.txt", "/out/missing.txt", "/out/deeper/missing.txt"] {
        assert!(
            matches!(resolver.resolve(target), Err(ResolveError::PathEscape(_))),
            "{target}"
        );
    }
}

#[cfg(unix)]
#[test]
fn test_resolve_missing_file_under_symlinked_dir_inside_root() {
    let (_dir, resolver) = site();
    std::os::unix::fs::symlink(resolver.root().join("foo"), resolver.root().join("alias"))
        .unwrap();

    let path = resolver.resolve("/alias/missing.txt").unwrap();
    assert_eq!(path, resolver.root().join("alias").join("missing.txt"));
}

#[test]
fn test_resolve_rejects_invalid_targets() {
    let (_dir, resolver) = site();

    for target in ["", "helloworld.html", "*", "/a\tb", "/%ff%fe", "/a%00b", "ftp://host/file"] {
        assert!(
            matches!(resolver.resolve(target), Err(ResolveError::InvalidTarget(_))),
            "{target:?}"
        );
    }
}

#[test]
fn test_resolve_absolute_form() {
    let (_dir, resolver) = site();

    let path = resolver.resolve("http://localhost:8080/helloworld.html?q").unwrap();
    assert_eq!(path, resolver.root().join("helloworld.html"));
}

#[test]
fn test_root_must_be_directory() {
    let (dir, _resolver) = site();

    assert!(PathResolver::new(dir.path().join("secret.txt")).is_err());
    assert!(PathResolver::new(dir.path().join("nope")).is_err());
}
