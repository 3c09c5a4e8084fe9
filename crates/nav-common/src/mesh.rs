//! Triangle mesh input for navigation mesh construction

use crate::{Error, Result, Vec3};

#[cfg(feature = "std")]
use std::fs::File;
#[cfg(feature = "std")]
use std::io::{BufRead, BufReader};
#[cfg(feature = "std")]
use std::path::Path;

/// A simple triangle mesh
#[derive(Debug, Clone, Default)]
pub struct TriMesh {
    /// The vertices of the mesh as a flat array of [x, y, z] coordinates
    pub vertices: Vec<f32>,
    /// The indices of the mesh, 3 per triangle
    pub indices: Vec<usize>,
    /// The number of vertices in the mesh
    pub vert_count: usize,
    /// The number of triangles in the mesh
    pub tri_count: usize,
}

impl TriMesh {
    /// Creates a new empty triangle mesh
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates a mesh from flat vertex and index buffers
    pub fn from_buffers(vertices: Vec<f32>, indices: Vec<usize>) -> Result<Self> {
        if vertices.len() % 3 != 0 {
            return Err(Error::InvalidMesh(format!(
                "vertex buffer length {} is not a multiple of 3",
                vertices.len()
            )));
        }
        if indices.len() % 3 != 0 {
            return Err(Error::InvalidMesh(format!(
                "index buffer length {} is not a multiple of 3",
                indices.len()
            )));
        }
        let vert_count = vertices.len() / 3;
        if let Some(&bad) = indices.iter().find(|&&i| i >= vert_count) {
            return Err(Error::InvalidMesh(format!(
                "index {} references a missing vertex (vertex count {})",
                bad, vert_count
            )));
        }
        let tri_count = indices.len() / 3;
        Ok(Self {
            vertices,
            indices,
            vert_count,
            tri_count,
        })
    }

    /// Loads a mesh from an OBJ file
    ///
    /// This method is only available when the `std` feature is enabled.
    #[cfg(feature = "std")]
    pub fn from_obj<P: AsRef<Path>>(path: P) -> Result<Self> {
        let file = File::open(path)?;
        let reader = BufReader::new(file);

        let mut mesh = Self::new();

        for line in reader.lines() {
            let line = line?;
            Self::parse_obj_line(&line, &mut mesh)?;
        }

        Ok(mesh)
    }

    /// Parses OBJ content from a string
    ///
    /// # Example
    ///
    /// ```
    /// use nav_common::TriMesh;
    ///
    /// let obj_content = r#"
    /// v 0.0 0.0 0.0
    /// v 1.0 0.0 0.0
    /// v 0.5 0.0 1.0
    /// f 1 2 3
    /// "#;
    ///
    /// let mesh = TriMesh::from_obj_str(obj_content).unwrap();
    /// assert_eq!(mesh.vert_count, 3);
    /// assert_eq!(mesh.tri_count, 1);
    /// ```
    pub fn from_obj_str(content: &str) -> Result<Self> {
        let mut mesh = Self::new();

        for line in content.lines() {
            Self::parse_obj_line(line, &mut mesh)?;
        }

        Ok(mesh)
    }

    fn parse_coordinate<'a>(
        tokens: &mut impl Iterator<Item = &'a str>,
        axis: &str,
    ) -> Result<f32> {
        tokens
            .next()
            .ok_or_else(|| Error::InvalidMesh(format!("Invalid vertex: missing {} coordinate", axis)))?
            .parse::<f32>()
            .map_err(|_| {
                Error::InvalidMesh(format!("Invalid vertex: {} coordinate is not a number", axis))
            })
    }

    /// Parses a single line from an OBJ file
    fn parse_obj_line(line: &str, mesh: &mut Self) -> Result<()> {
        let mut tokens = line.split_whitespace();

        match tokens.next() {
            Some("v") => {
                let x = Self::parse_coordinate(&mut tokens, "x")?;
                let y = Self::parse_coordinate(&mut tokens, "y")?;
                let z = Self::parse_coordinate(&mut tokens, "z")?;

                mesh.vertices.extend_from_slice(&[x, y, z]);
                mesh.vert_count += 1;
            }
            Some("f") => {
                let mut face_indices = Vec::new();

                for token in tokens {
                    let index_str = token.split('/').next().unwrap_or_default();

                    let raw = index_str.parse::<i64>().map_err(|_| {
                        Error::InvalidMesh("Invalid face: vertex index is not a number".to_string())
                    })?;

                    // OBJ indices are 1-based; negative values count back from the last vertex.
                    let index = match raw {
                        0 => None,
                        r if r > 0 => Some(r as usize - 1),
                        r => mesh.vert_count.checked_sub(r.unsigned_abs() as usize),
                    }
                    .ok_or_else(|| {
                        Error::InvalidMesh(format!("Invalid face: bad vertex index {}", raw))
                    })?;

                    face_indices.push(index);
                }

                if face_indices.len() < 3 {
                    return Err(Error::InvalidMesh(
                        "Invalid face: less than 3 vertices".to_string(),
                    ));
                }

                // Fan triangulation for faces with more than 3 vertices
                for i in 1..(face_indices.len() - 1) {
                    mesh.indices.push(face_indices[0]);
                    mesh.indices.push(face_indices[i]);
                    mesh.indices.push(face_indices[i + 1]);
                    mesh.tri_count += 1;
                }
            }
            _ => {
                // Normals, texture coordinates, groups and comments are not needed
            }
        }

        Ok(())
    }

    /// Swaps the winding order of every triangle.
    ///
    /// Navigation cells expect clockwise winding when viewed from above
    /// (looking down the y-axis). Most modeling tools export counter-clockwise
    /// triangles, so those meshes need their winding reversed.
    pub fn reverse_winding(&mut self) {
        for tri in self.indices.chunks_exact_mut(3) {
            tri.swap(1, 2);
        }
    }

    /// Calculates the axis-aligned bounding box of the mesh
    pub fn calculate_bounds(&self) -> (Vec3, Vec3) {
        if self.vert_count == 0 {
            return (Vec3::ZERO, Vec3::ZERO);
        }

        let mut bmin = Vec3::splat(f32::MAX);
        let mut bmax = Vec3::splat(f32::MIN);

        for v in self.vertices.chunks_exact(3) {
            let p = Vec3::new(v[0], v[1], v[2]);
            bmin = bmin.min(p);
            bmax = bmax.max(p);
        }

        (bmin, bmax)
    }
}
