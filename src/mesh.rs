//! Wavefront-style mesh decoder (§4.2).

/// axis-aligned bounds plus bounding sphere radius, computed while decoding.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct MeshBounds {
    /// minimum corner of the axis-aligned bounding box.
    pub min: [f32; 3],
    /// maximum corner of the axis-aligned bounding box.
    pub max: [f32; 3],
    /// maximum distance from the AABB center to any emitted vertex.
    pub radius: f32,
}

/// decoded mesh: the vertex/index arrays plus the metadata needed to populate a record.
#[derive(Debug, Clone)]
pub struct MeshPayload {
    /// little-endian bytes: vertex array (8 x f32 per vertex) then index array (u32 each).
    pub bytes: Vec<u8>,
    /// number of vertices emitted.
    pub vertex_count: u32,
    /// number of indices emitted (== vertex_count, no sharing).
    pub index_count: u32,
    /// bytes per vertex, always 32.
    pub vertex_stride: u32,
    /// byte offset of the index array within `bytes`.
    pub index_offset: u32,
    /// computed bounds.
    pub bounds: MeshBounds,
}

/// decode failure: the index is outside the range of positions/normals/uvs seen so far.
#[derive(Debug, Clone)]
pub struct MeshDecodeError(pub String);

impl std::fmt::Display for MeshDecodeError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl std::error::Error for MeshDecodeError {}

#[derive(Debug, Clone, Copy)]
struct FaceVertex {
    position: usize,
    uv: Option<usize>,
    normal: Option<usize>,
}

fn resolve_index(token: &str, count: usize, what: &str) -> Result<usize, MeshDecodeError> {
    let n: i64 = token
        .parse()
        .map_err(|_| MeshDecodeError(format!("invalid {what} index token '{token}'")))?;

    let resolved = if n > 0 {
        n - 1
    } else if n < 0 {
        count as i64 + n
    } else {
        return Err(MeshDecodeError(format!("{what} index cannot be 0")));
    };

    if resolved < 0 || resolved as usize >= count {
        return Err(MeshDecodeError(format!(
            "{what} index {n} out of range (have {count})"
        )));
    }

    Ok(resolved as usize)
}

fn parse_face_vertex(
    token: &str,
    position_count: usize,
    uv_count: usize,
    normal_count: usize,
) -> Result<FaceVertex, MeshDecodeError> {
    let mut parts = token.split('/');
    let p_tok = parts
        .next()
        .ok_or_else(|| MeshDecodeError("empty face vertex token".to_string()))?;
    let t_tok = parts.next().filter(|s| !s.is_empty());
    let n_tok = parts.next().filter(|s| !s.is_empty());

    let position = resolve_index(p_tok, position_count, "position")?;
    let uv = t_tok
        .map(|t| resolve_index(t, uv_count, "uv"))
        .transpose()?;
    let normal = n_tok
        .map(|n| resolve_index(n, normal_count, "normal"))
        .transpose()?;

    Ok(FaceVertex {
        position,
        uv,
        normal,
    })
}

/// parses a wavefront-style OBJ text stream into a canonical mesh payload.
pub fn decode(source: &str) -> Result<MeshPayload, MeshDecodeError> {
    let mut positions: Vec<[f32; 3]> = Vec::new();
    let mut normals: Vec<[f32; 3]> = Vec::new();
    let mut uvs: Vec<[f32; 2]> = Vec::new();

    let mut vertices: Vec<[f32; 8]> = Vec::new();
    let mut indices: Vec<u32> = Vec::new();

    for line in source.lines() {
        let line = line.trim();
        if line.is_empty() || line.starts_with('#') {
            continue;
        }

        let mut tokens = line.split_whitespace();
        let directive = match tokens.next() {
            Some(d) => d,
            None => continue,
        };

        match directive {
            "v" => {
                let coords = parse_floats::<3>(tokens, "v")?;
                positions.push(coords);
            }
            "vn" => {
                let coords = parse_floats::<3>(tokens, "vn")?;
                normals.push(coords);
            }
            "vt" => {
                let mut coords = parse_floats::<2>(tokens, "vt")?;
                coords[1] = 1.0 - coords[1];
                uvs.push(coords);
            }
            "f" => {
                let face_tokens: Vec<&str> = tokens.collect();
                if face_tokens.len() < 3 {
                    return Err(MeshDecodeError(format!(
                        "face has fewer than 3 vertices: '{line}'"
                    )));
                }

                let face_vertices: Vec<FaceVertex> = face_tokens
                    .iter()
                    .map(|t| parse_face_vertex(t, positions.len(), uvs.len(), normals.len()))
                    .collect::<Result<_, _>>()?;

                for i in 1..face_vertices.len() - 1 {
                    for fv in [face_vertices[0], face_vertices[i], face_vertices[i + 1]] {
                        let p = positions[fv.position];
                        let n = fv.normal.map(|idx| normals[idx]).unwrap_or([0.0, 1.0, 0.0]);
                        let uv = fv.uv.map(|idx| uvs[idx]).unwrap_or([0.0, 0.0]);

                        let index = vertices.len() as u32;
                        vertices.push([p[0], p[1], p[2], n[0], n[1], n[2], uv[0], uv[1]]);
                        indices.push(index);
                    }
                }
            }
            _ => {}
        }
    }

    if vertices.is_empty() || indices.is_empty() {
        return Err(MeshDecodeError(
            "OBJ mesh produced no vertices/indices".to_string(),
        ));
    }

    let bounds = compute_bounds(&vertices);

    let vertex_stride: u32 = 32;
    let mut bytes = Vec::with_capacity(vertices.len() * 32 + indices.len() * 4);
    for v in &vertices {
        for component in v {
            bytes.extend_from_slice(&component.to_le_bytes());
        }
    }
    let index_offset = bytes.len() as u32;
    for idx in &indices {
        bytes.extend_from_slice(&idx.to_le_bytes());
    }

    Ok(MeshPayload {
        bytes,
        vertex_count: vertices.len() as u32,
        index_count: indices.len() as u32,
        vertex_stride,
        index_offset,
        bounds,
    })
}

fn parse_floats<const N: usize>(
    tokens: std::str::SplitWhitespace<'_>,
    directive: &str,
) -> Result<[f32; N], MeshDecodeError> {
    let collected: Vec<f32> = tokens
        .take(N)
        .map(|t| {
            t.parse::<f32>()
                .map_err(|_| MeshDecodeError(format!("invalid float '{t}' in '{directive}' directive")))
        })
        .collect::<Result<_, _>>()?;

    collected.try_into().map_err(|v: Vec<f32>| {
        MeshDecodeError(format!(
            "'{directive}' directive expects {N} components, found {}",
            v.len()
        ))
    })
}

fn compute_bounds(vertices: &[[f32; 8]]) -> MeshBounds {
    if vertices.is_empty() {
        return MeshBounds {
            min: [0.0; 3],
            max: [0.0; 3],
            radius: 0.0,
        };
    }

    let mut min = [f32::MAX; 3];
    let mut max = [f32::MIN; 3];
    for v in vertices {
        for axis in 0..3 {
            min[axis] = min[axis].min(v[axis]);
            max[axis] = max[axis].max(v[axis]);
        }
    }

    let center = [
        (min[0] + max[0]) / 2.0,
        (min[1] + max[1]) / 2.0,
        (min[2] + max[2]) / 2.0,
    ];

    let radius = vertices
        .iter()
        .map(|v| {
            let dx = v[0] - center[0];
            let dy = v[1] - center[1];
            let dz = v[2] - center[2];
            (dx * dx + dy * dy + dz * dz).sqrt()
        })
        .fold(0.0f32, f32::max);

    MeshBounds { min, max, radius }
}
