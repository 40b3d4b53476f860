//! Command line front end for leaf navigation meshes

use anyhow::{anyhow, bail, Context, Result};
use clap::{Parser, Subcommand};
use glam::Vec3;
use std::fs::{self, File};
use std::io::Write;
use std::path::{Path, PathBuf};

use leafnav::{LeafNavMesh, NodeId, NAV_INVALID_IDX};
use leafnav_common::Hull;
use leafnav_gen::{
    BuildContext, GeneratorConfig, LeafNavMeshGenerator, MapEntity, WorldDescription,
};

/// Generate leaf navigation meshes from JSON world descriptions and route across them
#[derive(Parser, Debug)]
#[clap(author, version, about, long_about = None)]
struct Args {
    #[clap(subcommand)]
    command: Commands,
}

/// Settings that override the world file's own generator config
#[derive(clap::Args, Debug, Clone, Default)]
struct BuildOptions {
    /// Collision hull to build for (point, human, large, head)
    #[clap(long, value_parser = parse_hull)]
    hull: Option<Hull>,

    /// Depth of the node octree
    #[clap(long)]
    octree_depth: Option<u32>,

    /// Keep the parts of split leaves that lie inside solid entities
    #[clap(long)]
    include_solid_node: bool,

    /// Do not create ladder and teleport nodes
    #[clap(long)]
    no_entity_links: bool,

    /// Split leaves around brush entities after generation
    #[clap(long)]
    split: bool,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Build a navigation mesh and print statistics
    Generate {
        /// World description (JSON)
        #[clap(long, value_parser)]
        world: PathBuf,

        #[clap(flatten)]
        options: BuildOptions,

        /// Check the mesh for broken links and ids
        #[clap(long)]
        validate: bool,

        /// Print per-phase timings
        #[clap(long)]
        timings: bool,
    },

    /// Find a route between two points
    FindPath {
        /// World description (JSON)
        #[clap(long, value_parser)]
        world: PathBuf,

        /// Start position (x,y,z)
        #[clap(long, value_parser = parse_vector)]
        start: Vec3,

        /// End position (x,y,z)
        #[clap(long, value_parser = parse_vector)]
        end: Vec3,

        #[clap(flatten)]
        options: BuildOptions,

        /// Use Dijkstra instead of A*
        #[clap(long)]
        dijkstra: bool,

        /// Output path file
        #[clap(long, value_parser)]
        output: Option<PathBuf>,
    },
}

/// Parse a comma-separated vector
fn parse_vector(s: &str) -> Result<Vec3, String> {
    let parts: Vec<&str> = s.split(',').collect();

    if parts.len() != 3 {
        return Err(format!(
            "Vector must have 3 components, got {}",
            parts.len()
        ));
    }

    let x = parts[0].trim().parse::<f32>().map_err(|e| e.to_string())?;
    let y = parts[1].trim().parse::<f32>().map_err(|e| e.to_string())?;
    let z = parts[2].trim().parse::<f32>().map_err(|e| e.to_string())?;

    Ok(Vec3::new(x, y, z))
}

fn parse_hull(s: &str) -> Result<Hull, String> {
    match s.to_lowercase().as_str() {
        "point" => Ok(Hull::Point),
        "human" => Ok(Hull::Human),
        "large" => Ok(Hull::Large),
        "head" => Ok(Hull::Head),
        other => Err(format!("unknown hull '{}'", other)),
    }
}

fn main() -> Result<()> {
    let args = Args::parse();

    match args.command {
        Commands::Generate {
            world,
            options,
            validate,
            timings,
        } => generate(&world, &options, validate, timings),
        Commands::FindPath {
            world,
            start,
            end,
            options,
            dijkstra,
            output,
        } => find_path(&world, start, end, &options, dijkstra, output.as_deref()),
    }
}

/// Load a world description from a JSON file
fn load_description(path: &Path) -> Result<WorldDescription> {
    let text = fs::read_to_string(path)
        .with_context(|| format!("Failed to read world file: {}", path.display()))?;
    serde_json::from_str(&text)
        .with_context(|| format!("Failed to parse world file: {}", path.display()))
}

/// Generator settings from the world file with command line overrides applied
fn resolve_config(desc: &WorldDescription, options: &BuildOptions) -> GeneratorConfig {
    let mut config = desc.config.clone().unwrap_or_default();
    if let Some(hull) = options.hull {
        config = config.with_hull(hull);
    }
    if let Some(depth) = options.octree_depth {
        config = config.with_octree_depth(depth);
    }
    if options.include_solid_node {
        config = config.with_include_solid_node(true);
    }
    if options.no_entity_links {
        config = config.with_link_entities(false);
    }
    config
}

struct Built {
    mesh: LeafNavMesh,
    ctx: BuildContext,
    entities: Vec<MapEntity>,
    split_changes: usize,
}

fn build(desc: &WorldDescription, options: &BuildOptions) -> Result<Built> {
    let config = resolve_config(desc, options);
    let entities = desc.entity_list();

    let mut ctx = BuildContext::new();
    let mut generator = LeafNavMeshGenerator::new(config);
    let mut mesh = generator
        .generate(&desc.world, &entities, &mut ctx)
        .map_err(|e| anyhow!("Failed to build navigation mesh: {}", e))?;

    let split_changes = if options.split {
        generator
            .split_entity_leaves(&desc.world, &mut mesh, &entities, &mut ctx)
            .map_err(|e| anyhow!("Failed to split around entities: {}", e))?
    } else {
        0
    };

    Ok(Built {
        mesh,
        ctx,
        entities,
        split_changes,
    })
}

/// Build a navigation mesh and report on it
fn generate(world: &Path, options: &BuildOptions, validate: bool, timings: bool) -> Result<()> {
    println!("Loading world from {}...", world.display());
    let desc = load_description(world)?;
    println!(
        "World loaded: {} models, {} entities",
        desc.world.models.len(),
        desc.entities.len()
    );

    let built = build(&desc, options)?;
    let mesh = &built.mesh;
    let links: usize = mesh.nodes().iter().map(|n| n.links.len()).sum();
    let entity_nodes = mesh.nodes().iter().filter(|n| n.is_entity()).count();

    println!(
        "Navigation mesh built: {} nodes ({} indexed, {} entity), {} links",
        mesh.len(),
        mesh.world_leaf_count(),
        entity_nodes,
        links
    );
    if options.split {
        println!(
            "Entity split: {} leaves changed, {} split",
            built.split_changes,
            mesh.nodes().iter().filter(|n| n.is_split()).count()
        );
    }
    if timings {
        built.ctx.print_timer_summary();
    }

    if validate {
        if !mesh.validate() {
            bail!("Navigation mesh failed validation");
        }
        println!("Navigation mesh is valid");
    }

    Ok(())
}

/// Resolved route with its anchors and total cost
struct Route {
    nodes: Vec<NodeId>,
    anchors: Vec<Vec3>,
    cost: f32,
}

fn route(
    built: &Built,
    desc: &WorldDescription,
    start: Vec3,
    end: Vec3,
    dijkstra: bool,
) -> Result<Route> {
    let mesh = &built.mesh;
    let start_node = mesh.get_node_idx(&desc.world, start);
    if start_node == NAV_INVALID_IDX {
        bail!("No navigation node at start position {:?}", start);
    }
    let end_node = mesh.get_node_idx(&desc.world, end);
    if end_node == NAV_INVALID_IDX {
        bail!("No navigation node at end position {:?}", end);
    }

    let nodes = if dijkstra {
        mesh.dijkstra_route(start_node, end_node)
    } else {
        mesh.astar_route(start_node, end_node)
    };
    let anchors = nodes
        .iter()
        .filter_map(|&id| mesh.node(id).map(|n| n.origin))
        .collect();
    let cost = mesh.path_cost(&nodes);

    Ok(Route {
        nodes,
        anchors,
        cost,
    })
}

/// Find a path between two points
fn find_path(
    world: &Path,
    start: Vec3,
    end: Vec3,
    options: &BuildOptions,
    dijkstra: bool,
    output: Option<&Path>,
) -> Result<()> {
    println!("Loading world from {}...", world.display());
    let desc = load_description(world)?;
    let built = build(&desc, options)?;
    println!(
        "Navigation mesh built: {} nodes for {} entities",
        built.mesh.len(),
        built.entities.len()
    );

    println!("Finding path from {:?} to {:?}...", start, end);
    let route = route(&built, &desc, start, end, dijkstra)?;
    if route.nodes.is_empty() {
        bail!("No route from {:?} to {:?}", start, end);
    }
    println!(
        "Found path through {} nodes, cost {:.1}",
        route.nodes.len(),
        route.cost
    );

    if let Some(output_path) = output {
        println!("Saving path to {}...", output_path.display());

        let mut file = File::create(output_path)
            .with_context(|| format!("Failed to create output file: {}", output_path.display()))?;

        writeln!(file, "# Path from {:?} to {:?}", start, end)?;
        writeln!(file, "# {} nodes, cost {}", route.nodes.len(), route.cost)?;
        for (id, anchor) in route.nodes.iter().zip(&route.anchors) {
            writeln!(file, "{},{},{},{}", id, anchor.x, anchor.y, anchor.z)?;
        }
    } else {
        println!("Path:");
        for (i, (id, anchor)) in route.nodes.iter().zip(&route.anchors).enumerate() {
            println!("{}: node {} at {},{},{}", i, id, anchor.x, anchor.y, anchor.z);
        }
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use leafnav_common::Aabb;
    use leafnav_gen::LeafWorld;

    fn write_world(dir: &Path, desc: &WorldDescription) -> Result<PathBuf> {
        let path = dir.join("world.json");
        fs::write(&path, serde_json::to_string_pretty(desc)?)?;
        Ok(path)
    }

    fn corridor() -> WorldDescription {
        WorldDescription {
            world: LeafWorld::from_boxes(&[
                Aabb::new(Vec3::ZERO, Vec3::new(64.0, 64.0, 64.0)),
                Aabb::new(Vec3::new(64.0, 0.0, 0.0), Vec3::new(128.0, 64.0, 64.0)),
            ]),
            entities: Vec::new(),
            config: None,
        }
    }

    #[test]
    fn test_parse_vector() {
        assert_eq!(parse_vector("1,2.5,-3"), Ok(Vec3::new(1.0, 2.5, -3.0)));
        assert_eq!(parse_vector(" 1, 2, 3"), Ok(Vec3::new(1.0, 2.0, 3.0)));
        assert!(parse_vector("1,2").is_err());
        assert!(parse_vector("1,x,3").is_err());
    }

    #[test]
    fn test_parse_hull() {
        assert_eq!(parse_hull("Point"), Ok(Hull::Point));
        assert_eq!(parse_hull("head"), Ok(Hull::Head));
        assert!(parse_hull("giant").is_err());
    }

    #[test]
    fn test_overrides_apply_on_top_of_world_config() {
        let mut desc = corridor();
        desc.config = Some(GeneratorConfig::default().with_octree_depth(3));

        let config = resolve_config(&desc, &BuildOptions::default());
        assert_eq!(config.octree_depth, 3);
        assert!(config.link_entities);

        let options = BuildOptions {
            hull: Some(Hull::Point),
            octree_depth: Some(5),
            no_entity_links: true,
            ..BuildOptions::default()
        };
        let config = resolve_config(&desc, &options);
        assert_eq!(config.hull, Hull::Point);
        assert_eq!(config.octree_depth, 5);
        assert!(!config.link_entities);
    }

    #[test]
    fn test_route_through_loaded_world() -> Result<()> {
        let dir = tempfile::tempdir()?;
        let path = write_world(dir.path(), &corridor())?;

        let desc = load_description(&path)?;
        let built = build(&desc, &BuildOptions::default())?;
        assert_eq!(built.mesh.len(), 2);
        assert_eq!(built.entities.len(), 1);

        let start = Vec3::new(10.0, 10.0, 10.0);
        let end = Vec3::new(100.0, 10.0, 10.0);
        let astar = route(&built, &desc, start, end, false)?;
        let dijkstra = route(&built, &desc, start, end, true)?;
        assert_eq!(astar.nodes, vec![0, 1]);
        assert_eq!(dijkstra.nodes, astar.nodes);
        assert!((astar.cost - 64.0).abs() < 0.1);

        assert!(route(&built, &desc, Vec3::splat(-100.0), end, false).is_err());
        Ok(())
    }

    #[test]
    fn test_find_path_writes_output() -> Result<()> {
        let dir = tempfile::tempdir()?;
        let world = write_world(dir.path(), &corridor())?;
        let output = dir.path().join("path.txt");

        find_path(
            &world,
            Vec3::new(10.0, 10.0, 10.0),
            Vec3::new(100.0, 10.0, 10.0),
            &BuildOptions::default(),
            false,
            Some(&output),
        )?;
        let text = fs::read_to_string(&output)?;
        let rows: Vec<&str> = text.lines().filter(|l| !l.starts_with('#')).collect();
        assert_eq!(rows.len(), 2);
        assert!(rows[0].starts_with("0,"));
        assert!(rows[1].starts_with("1,"));
        Ok(())
    }

    #[test]
    fn test_generate_reports_bad_input() -> Result<()> {
        let dir = tempfile::tempdir()?;
        let path = dir.path().join("broken.json");
        fs::write(&path, "{ not json")?;
        assert!(generate(&path, &BuildOptions::default(), true, false).is_err());

        let empty = write_world(dir.path(), &WorldDescription::default())?;
        assert!(generate(&empty, &BuildOptions::default(), true, false).is_err());

        let good = write_world(dir.path(), &corridor())?;
        let options = BuildOptions {
            split: true,
            ..BuildOptions::default()
        };
        generate(&good, &options, true, true)?;
        Ok(())
    }
}
