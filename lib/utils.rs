//! Small output helpers for binaries.

/// Create a directory and all its parents, panicking on failure.
#[macro_export]
macro_rules! mkdir {
    ( $path:expr ) => {
        std::fs::create_dir_all(&$path)
            .unwrap_or_else(|_| {
                panic!("couldn't create directory {:?}", $path)
            })
    }
}

/// Write a set of named arrays to a `.npz` archive, panicking on failure.
///
/// Intended for post-hoc plotting with external tools.
#[macro_export]
macro_rules! write_npz {
    (
        $path:expr,
        arrays: { $( $name:literal => $arr:expr ),* $(,)? }
    ) => {
        {
            let mut npz
                = ndarray_npy::NpzWriter::new(
                    std::fs::File::create(&$path)
                        .unwrap_or_else(|_| {
                            panic!("couldn't create file {:?}", $path)
                        })
                );
            $(
                npz.add_array($name, $arr)
                    .unwrap_or_else(|_| {
                        panic!("couldn't write array '{}'", $name)
                    });
            )*
            npz.finish()
                .unwrap_or_else(|_| {
                    panic!("couldn't finalize archive {:?}", $path)
                });
        }
    }
}
