use std::env;

use cafe_class_path::ClassLoader;

fn main() {
    pretty_env_logger::init();

    let mut loader = ClassLoader::new();
    for path in env::args().skip(1) {
        if let Err(e) = loader.register(&path) {
            log::warn!("Can't register {}: {}", path, e);
        }
    }

    let mut names = loader.class_paths().map(str::to_owned).collect::<Vec<_>>();
    names.sort();

    for name in names {
        let class_file = match loader.load(&name) {
            Ok(class_file) => class_file,
            Err(e) => {
                log::warn!("Can't load {}: {}", name, e);
                continue;
            }
        };

        let version = class_file.version_name().map(str::to_owned).unwrap_or_else(|| {
            format!(
                "{}.{}",
                class_file.major_version(),
                class_file.minor_version()
            )
        });
        let super_class = class_file.super_class().ok().flatten().unwrap_or_default();

        println!("{} ({})", name, version);
        println!("    extends {}", super_class);
        println!(
            "    {} fields, {} methods, {} constants",
            class_file.fields.len(),
            class_file.methods.len(),
            class_file.constant_pool.len()
        );
    }
}
