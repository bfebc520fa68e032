//! Example: Load and inspect an RWX model.
//!
//! Run with: cargo run --example load_rwx -- path/to/model.rwx [config.json]
//!
//! The optional JSON file holds a `LoaderConfig`, for example
//! `{ "texture_extension": "png", "wait_full_load": true }`.

use std::env;

use anyhow::Context;
use rwx_core::rwx::{LoaderConfig, RwxLoader, RwxObject};
use rwx_core::scene::{NodeId, NodeKind, Scene};

fn main() -> anyhow::Result<()> {
    env_logger::init();

    let args: Vec<String> = env::args().collect();

    if args.len() < 2 {
        println!("Usage: load_rwx <path-to-rwx-file> [config.json]");
        println!("\nExamples:");
        println!("  cargo run --example load_rwx -- models/tree.rwx");
        println!("  cargo run --example load_rwx -- models/tree.rwx loader.json");
        return Ok(());
    }

    let config = match args.get(2) {
        Some(config_path) => {
            let json = std::fs::read_to_string(config_path)
                .with_context(|| format!("reading config {}", config_path))?;
            LoaderConfig::from_json(&json)?
        }
        None => LoaderConfig::default().with_wait_full_load(true),
    };

    let path = &args[1];
    println!("Loading RWX file: {}", path);

    let model = RwxLoader::new(config)
        .load(path)
        .with_context(|| format!("loading {}", path))?;

    match &model.object {
        RwxObject::Graph(scene) => print_scene(scene),
        RwxObject::Flat(flat) => {
            println!("\n=== Flattened mesh ===");
            println!("Vertices: {}", flat.mesh.vertex_count());
            println!("Triangles: {}", flat.mesh.triangle_count());
            println!("Material groups: {}", flat.mesh.groups.len());
            println!("Axis alignment: {:?}", flat.metadata.axis_alignment);
        }
    }

    println!("\n--- Materials ---");
    for (i, material) in model.materials.iter().enumerate() {
        let appearance = material.appearance();
        println!(
            "  [{}] color ({:.2}, {:.2}, {:.2}) opacity {:.2} texture {:?} mask {:?} loaded {}",
            i,
            appearance.color.x,
            appearance.color.y,
            appearance.color.z,
            appearance.opacity,
            material.texture_name(),
            material.mask_name(),
            material.texture().is_some()
        );
    }

    if !model.diagnostics.is_empty() {
        println!("\n--- Texture problems ---");
        for problem in &model.diagnostics {
            println!("  {}", problem);
        }
    }

    Ok(())
}

fn print_scene(scene: &Scene) {
    println!("\n=== Scene: {} ===", scene.name);
    println!("Nodes: {}", scene.node_count());
    println!("Meshes: {}", scene.mesh_count());
    println!("Total triangles: {}", scene.total_triangle_count());
    println!("Axis alignment: {:?}", scene.metadata().axis_alignment);

    println!("\n--- Hierarchy ---");
    print_node(scene, scene.root(), 1);

    let world_bounds = scene.world_bounds();
    println!("\n--- World Bounds ---");
    println!(
        "  Min: ({:.2}, {:.2}, {:.2})",
        world_bounds.min.x, world_bounds.min.y, world_bounds.min.z
    );
    println!(
        "  Max: ({:.2}, {:.2}, {:.2})",
        world_bounds.max.x, world_bounds.max.y, world_bounds.max.z
    );

    let size = world_bounds.extent();
    let center = world_bounds.centroid();
    println!("  Size: ({:.2}, {:.2}, {:.2})", size.x, size.y, size.z);
    println!("  Center: ({:.2}, {:.2}, {:.2})", center.x, center.y, center.z);
}

fn print_node(scene: &Scene, id: NodeId, depth: usize) {
    let Some(node) = scene.node(id) else {
        return;
    };

    let indent = "  ".repeat(depth);
    match &node.kind {
        NodeKind::Group => {
            let origin = scene.world_transform(id).transform_point3(rwx_math::Vec3::ZERO);
            println!(
                "{}group {} at ({:.2}, {:.2}, {:.2})",
                indent,
                node.name.as_deref().unwrap_or(""),
                origin.x,
                origin.y,
                origin.z
            );
        }
        NodeKind::Mesh(mesh) => println!(
            "{}mesh - {} vertices, {} triangles, {} batches",
            indent,
            mesh.vertex_count(),
            mesh.triangle_count(),
            mesh.groups.len()
        ),
        NodeKind::Lines(lines) => println!("{}lines - {} segments", indent, lines.segment_count()),
    }

    for child in &node.children {
        print_node(scene, *child, depth + 1);
    }
}
