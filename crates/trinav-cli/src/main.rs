//! CLI utility for triangle-cell navigation meshes

use anyhow::{anyhow, bail, Context, Result};
use clap::{Parser, Subcommand};
use glam::Vec3;
use std::fs::File;
use std::io::Write;
use std::path::{Path, PathBuf};

use nav_common::TriMesh;
use trinav::{MasterPlanner, NavRequestState, TriNavConfig, TriNavMesh};

/// A CLI utility for building triangle-cell navigation meshes and planning paths
#[derive(Parser, Debug)]
#[clap(author, version, about, long_about = None)]
struct Args {
    #[clap(subcommand)]
    command: Commands,
}

/// Options shared by every command that loads a mesh
#[derive(clap::Args, Debug)]
struct MeshArgs {
    /// Input mesh file (OBJ format)
    #[clap(long, value_parser)]
    mesh: PathBuf,

    /// Configuration file (JSON)
    #[clap(long, value_parser)]
    config: Option<PathBuf>,

    /// Reverse the winding of every triangle (for counter-clockwise meshes)
    #[clap(long)]
    reverse_winding: bool,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Build a navigation mesh and print its statistics
    Info {
        #[clap(flatten)]
        mesh: MeshArgs,
    },

    /// Find a path on a navigation mesh
    FindPath {
        #[clap(flatten)]
        mesh: MeshArgs,

        /// Start position (x,y,z)
        #[clap(long, value_parser = parse_vector, allow_hyphen_values = true)]
        start: Vec3,

        /// End position (x,y,z)
        #[clap(long, value_parser = parse_vector, allow_hyphen_values = true)]
        end: Vec3,

        /// Output path file (.json writes a JSON array of waypoints)
        #[clap(long, value_parser)]
        output: Option<PathBuf>,
    },

    /// Check for line of sight between two points
    Los {
        #[clap(flatten)]
        mesh: MeshArgs,

        /// Start position (x,y,z)
        #[clap(long, value_parser = parse_vector, allow_hyphen_values = true)]
        start: Vec3,

        /// End position (x,y,z)
        #[clap(long, value_parser = parse_vector, allow_hyphen_values = true)]
        end: Vec3,
    },

    /// Find the closest point on a navigation mesh
    Nearest {
        #[clap(flatten)]
        mesh: MeshArgs,

        /// Query position (x,y,z)
        #[clap(long, value_parser = parse_vector, allow_hyphen_values = true)]
        point: Vec3,
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

fn main() -> Result<()> {
    let args = Args::parse();

    match args.command {
        Commands::Info { mesh } => info(&mesh),
        Commands::FindPath {
            mesh,
            start,
            end,
            output,
        } => find_path(&mesh, start, end, output.as_deref()),
        Commands::Los { mesh, start, end } => line_of_sight(&mesh, start, end),
        Commands::Nearest { mesh, point } => nearest(&mesh, point),
    }
}

fn load_config(args: &MeshArgs) -> Result<TriNavConfig> {
    let config = match &args.config {
        Some(path) => TriNavConfig::load_from_json(path)
            .with_context(|| format!("Failed to load configuration: {}", path.display()))?,
        None => TriNavConfig::default(),
    };
    config.validate().context("Invalid configuration")?;
    Ok(config)
}

/// Load the input mesh and build the navigation mesh from it
fn load_nav_mesh(args: &MeshArgs, config: &TriNavConfig) -> Result<TriNavMesh> {
    println!("Loading mesh from {}...", args.mesh.display());

    let mut mesh = TriMesh::from_obj(&args.mesh)
        .with_context(|| format!("Failed to load mesh: {}", args.mesh.display()))?;
    if args.reverse_winding {
        mesh.reverse_winding();
    }

    println!(
        "Mesh loaded: {} vertices, {} triangles",
        mesh.vert_count, mesh.tri_count
    );

    let nav_mesh = TriNavMesh::from_tri_mesh(&mesh, &config.mesh)
        .map_err(|e| anyhow!("Failed to build navigation mesh: {}", e))?;

    println!(
        "Navigation mesh built: {} cells, {} links",
        nav_mesh.cell_count(),
        nav_mesh.link_count()
    );

    Ok(nav_mesh)
}

/// Print navigation mesh statistics
fn info(args: &MeshArgs) -> Result<()> {
    let config = load_config(args)?;
    let nav_mesh = load_nav_mesh(args, &config)?;

    let tree = nav_mesh.quad_tree();
    println!(
        "Bounds (xz): min={:?}, max={:?}",
        tree.bounds_min(),
        tree.bounds_max()
    );

    let mut by_links = [0usize; trinav::MAX_LINKS + 1];
    for cell in nav_mesh.cells() {
        by_links[cell.link_count()] += 1;
    }
    for (links, count) in by_links.iter().enumerate() {
        println!("Cells with {} link(s): {}", links, count);
    }

    Ok(())
}

/// Find a path on a navigation mesh
fn find_path(args: &MeshArgs, start: Vec3, end: Vec3, output: Option<&Path>) -> Result<()> {
    let config = load_config(args)?;
    let nav_mesh = load_nav_mesh(args, &config)?;
    let cell_limit = nav_mesh.cell_count();

    println!("Finding path from {:?} to {:?}...", start, end);

    let mut planner = MasterPlanner::new(nav_mesh, config.planner);
    let request = planner.path_planner().get_path(start, end);
    // Every pass advances each search by one cell.
    for _ in 0..=cell_limit {
        if request.is_finished() {
            break;
        }
        planner.process(true);
    }

    if request.state() != NavRequestState::Complete {
        bail!("No path found from {:?} to {:?}", start, end);
    }
    let path = request
        .data()
        .ok_or_else(|| anyhow!("Completed path request carried no path"))?;

    println!("Found path with {} cells", path.path_poly_count());

    let mut waypoints = vec![start];
    let mut from = start;
    for _ in 0..=path.path_poly_count() * 2 {
        let next = path
            .target(from)
            .ok_or_else(|| anyhow!("Waypoint {:?} left the path", from))?;
        if next == from {
            break;
        }
        waypoints.push(next);
        if next == path.goal() {
            break;
        }
        from = next;
    }

    println!("Generated path with {} waypoints", waypoints.len());

    if let Some(output_path) = output {
        println!("Saving path to {}...", output_path.display());

        let mut file = File::create(output_path)
            .with_context(|| format!("Failed to create output file: {}", output_path.display()))?;

        let is_json = output_path
            .extension()
            .and_then(|ext| ext.to_str())
            .is_some_and(|ext| ext.eq_ignore_ascii_case("json"));
        if is_json {
            let points: Vec<[f32; 3]> = waypoints.iter().map(|p| p.to_array()).collect();
            serde_json::to_writer_pretty(&mut file, &points)
                .context("Failed to write waypoints as JSON")?;
        } else {
            writeln!(file, "# Path from {:?} to {:?}", start, end)?;
            writeln!(file, "# {} waypoints", waypoints.len())?;

            for waypoint in &waypoints {
                writeln!(file, "{},{},{}", waypoint.x, waypoint.y, waypoint.z)?;
            }
        }
    } else {
        println!("Path:");
        for (i, waypoint) in waypoints.iter().enumerate() {
            println!("{}: {},{},{}", i, waypoint.x, waypoint.y, waypoint.z);
        }
    }

    planner.dispose();
    Ok(())
}

/// Check line of sight between two points on the mesh
fn line_of_sight(args: &MeshArgs, start: Vec3, end: Vec3) -> Result<()> {
    let config = load_config(args)?;
    let nav_mesh = load_nav_mesh(args, &config)?;

    let (start_cell, _) = nav_mesh
        .closest_cell(start, true)
        .ok_or_else(|| anyhow!("Start {:?} is not over the mesh", start))?;
    let (end_cell, _) = nav_mesh
        .closest_cell(end, true)
        .ok_or_else(|| anyhow!("End {:?} is not over the mesh", end))?;

    let visible = nav_mesh
        .has_los(
            nav_common::xz(start),
            nav_common::xz(end),
            start_cell,
            end_cell,
        )
        .map_err(|e| anyhow!("Line of sight check failed: {}", e))?;

    println!(
        "Line of sight from {} to {}: {}",
        start_cell,
        end_cell,
        if visible { "clear" } else { "blocked" }
    );

    Ok(())
}

/// Find the closest point on the mesh through the planner
fn nearest(args: &MeshArgs, point: Vec3) -> Result<()> {
    let config = load_config(args)?;
    let nav_mesh = load_nav_mesh(args, &config)?;

    let mut planner = MasterPlanner::new(nav_mesh, config.planner);
    let nearest = planner.path_planner().get_nearest_valid_location(point);
    let valid = planner.path_planner().is_valid_location(point, config.mesh.plane_tolerance);
    planner.process_once(false);

    let location = nearest
        .data()
        .ok_or_else(|| anyhow!("No location found near {:?}", point))?;
    println!("Nearest location: {},{},{}", location.x, location.y, location.z);
    println!(
        "Query point is on the mesh: {}",
        valid.data().unwrap_or(false)
    );

    planner.dispose();
    Ok(())
}
