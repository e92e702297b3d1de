//! Marching Cubes case table and per-cube triangle emission.
//!
//! Each cube is formed by 8 neighboring voxels. The cube's configuration code
//! has bit `i` set when corner `i` is inside the surface; the case table maps the
//! code to up to five triangles whose vertices lie on crossing edges.
//!
//! Corner `i` sits at offset `(i & 1, (i >> 1) & 1, (i >> 2) & 1)`. Edges 0-3 run
//! along x, 4-7 along y and 8-11 along z (see [`EDGE_CORNERS`]).

#![allow(clippy::unreadable_literal)]

use glam::{UVec3, Vec3};
use serde::{Deserialize, Serialize};

use crate::grid::{Cell, CellGrid};
use crate::triangle_buffer::Triangle;

/// Largest number of triangles any case emits.
pub const MAX_TRIANGLES_PER_CELL: usize = 5;

/// Corner pair joined by each of the 12 cube edges.
pub const EDGE_CORNERS: [[usize; 2]; 12] = [
    [0, 1],
    [2, 3],
    [4, 5],
    [6, 7],
    [0, 2],
    [1, 3],
    [4, 6],
    [5, 7],
    [0, 4],
    [1, 5],
    [2, 6],
    [3, 7],
];

/// Offset of corner `i` from the cube's minimum voxel.
#[inline]
#[must_use]
pub fn corner_offset(i: usize) -> UVec3 {
    UVec3::new((i & 1) as u32, ((i >> 1) & 1) as u32, ((i >> 2) & 1) as u32)
}

/// Decides which voxels are inside the surface.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum SurfaceSelector {
    /// Voxels whose state equals `target` are inside.
    State { target: u32 },
    /// The state code is the scalar field; voxels above `iso` are inside.
    Threshold { iso: f32 },
}

impl Default for SurfaceSelector {
    fn default() -> Self {
        Self::State {
            target: Cell::ALIVE_STATE,
        }
    }
}

impl SurfaceSelector {
    /// Selector code shared with the device extraction kernel.
    #[must_use]
    pub fn code(&self) -> u32 {
        match self {
            Self::State { .. } => 0,
            Self::Threshold { .. } => 1,
        }
    }

    /// Target state (0 for threshold selectors).
    #[must_use]
    pub fn target(&self) -> u32 {
        match *self {
            Self::State { target } => target,
            Self::Threshold { .. } => 0,
        }
    }

    /// Scalar field value of a cell.
    #[inline]
    #[must_use]
    #[allow(clippy::cast_precision_loss)]
    pub fn field(&self, cell: Cell) -> f32 {
        match *self {
            Self::State { target } => {
                if cell.state == target {
                    1.0
                } else {
                    0.0
                }
            }
            Self::Threshold { .. } => cell.state as f32,
        }
    }

    /// Isovalue separating inside from outside.
    #[must_use]
    pub fn iso(&self) -> f32 {
        match *self {
            Self::State { .. } => 0.5,
            Self::Threshold { iso } => iso,
        }
    }
}

/// Number of triangles emitted for a configuration code.
#[inline]
#[must_use]
pub fn case_triangle_count(config: u8) -> usize {
    (MC_TRIS[config as usize] & 0xF) as usize
}

/// Edge triples of the triangles emitted for a configuration code.
pub fn case_triangles(config: u8) -> impl Iterator<Item = [usize; 3]> {
    let entry = MC_TRIS[config as usize];
    (0..case_triangle_count(config)).map(move |t| {
        let edge = |k: usize| ((entry >> (4 + 4 * (3 * t + k))) & 0xF) as usize;
        [edge(0), edge(1), edge(2)]
    })
}

/// The case table split into `[low, high]` 32-bit words for device upload.
#[must_use]
pub fn case_table_words() -> Vec<[u32; 2]> {
    MC_TRIS
        .iter()
        .map(|&entry| [(entry & 0xFFFF_FFFF) as u32, (entry >> 32) as u32])
        .collect()
}

/// Configuration code from 8 corner field values.
#[inline]
#[must_use]
pub fn cube_configuration(values: &[f32; 8], iso: f32) -> u8 {
    values
        .iter()
        .enumerate()
        .fold(0_u8, |code, (i, &v)| if v > iso { code | (1 << i) } else { code })
}

/// Triangles emitted by one cube.
#[derive(Debug, Clone, Copy, Default)]
pub struct CellTriangles {
    triangles: [Triangle; MAX_TRIANGLES_PER_CELL],
    len: usize,
}

impl CellTriangles {
    /// Emitted triangles.
    #[must_use]
    pub fn as_slice(&self) -> &[Triangle] {
        &self.triangles[..self.len]
    }

    /// Number of emitted triangles.
    #[must_use]
    pub fn len(&self) -> usize {
        self.len
    }

    /// Returns true if the cube emitted nothing.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    fn push(&mut self, triangle: Triangle) {
        self.triangles[self.len] = triangle;
        self.len += 1;
    }
}

/// Polygonizes the cube whose minimum corner is voxel `(x, y, z)`.
///
/// Requires `x + 1`, `y + 1` and `z + 1` to be inside the grid. Positions are in
/// grid space (voxel centers at integer coordinates). Normals follow the
/// negated field gradient; where the gradient vanishes the face normal of the
/// emitted triangle is used instead.
#[must_use]
pub fn polygonize_cell(
    grid: &CellGrid,
    selector: SurfaceSelector,
    x: u32,
    y: u32,
    z: u32,
) -> CellTriangles {
    let base = UVec3::new(x, y, z);
    let iso = selector.iso();
    let mut values = [0.0_f32; 8];
    for (i, v) in values.iter_mut().enumerate() {
        let p = base + corner_offset(i);
        *v = selector.field(grid.get(p.x, p.y, p.z));
    }

    let mut out = CellTriangles::default();
    let config = cube_configuration(&values, iso);
    if config == 0 || config == 0xFF {
        return out;
    }

    let mut gradients = [Vec3::ZERO; 8];
    for (i, g) in gradients.iter_mut().enumerate() {
        *g = field_gradient(grid, selector, base + corner_offset(i));
    }

    let edge_vertex = |edge: usize| -> (Vec3, Vec3) {
        let [a, b] = EDGE_CORNERS[edge];
        // Shifted so that inside corners are negative.
        let va = iso - values[a];
        let vb = iso - values[b];
        let t = va / (va - vb);
        let pa = (base + corner_offset(a)).as_vec3();
        let pb = (base + corner_offset(b)).as_vec3();
        let grad = gradients[a].lerp(gradients[b], t);
        (pa.lerp(pb, t), -grad)
    };

    for edges in case_triangles(config) {
        let mut triangle = Triangle::default();
        for (k, &edge) in edges.iter().enumerate() {
            let (p, n) = edge_vertex(edge);
            triangle.positions[k] = p;
            triangle.normals[k] = n;
        }
        let face = triangle.face_normal();
        for n in &mut triangle.normals {
            *n = n.try_normalize().unwrap_or(face);
        }
        out.push(triangle);
    }
    out
}

/// Central-difference gradient of the scalar field, sampling clamped to the grid.
#[must_use]
pub fn field_gradient(grid: &CellGrid, selector: SurfaceSelector, p: UVec3) -> Vec3 {
    let max = grid.extent().size() - UVec3::ONE;
    let sample = |q: UVec3| {
        let q = q.min(max);
        selector.field(grid.get(q.x, q.y, q.z))
    };
    let lo = |axis: UVec3| p.saturating_sub(axis);
    Vec3::new(
        sample(p + UVec3::X) - sample(lo(UVec3::X)),
        sample(p + UVec3::Y) - sample(lo(UVec3::Y)),
        sample(p + UVec3::Z) - sample(lo(UVec3::Z)),
    ) * 0.5
}

/// Look-up table for triangle configurations (256 entries, one per cube configuration).
///
/// Each entry is a `u64` encoding:
/// - Bits `[3:0]`: Number of triangles (0-5)
/// - Bits `[7:4]`, `[11:8]`, ...: Edge indices (0-11) for each triangle vertex, 4 bits each
#[rustfmt::skip]
static MC_TRIS: [u64; 256] = [
    0, 33793, 36945, 159668546,
    18961, 144771090, 5851666, 595283255635,
    20913, 67640146, 193993474, 655980856339,
    88782242, 736732689667, 797430812739, 194554754,
    26657, 104867330, 136709522, 298069416227,
    109224258, 8877909667, 318136408323, 1567994331701604,
    189884450, 350847647843, 559958167731, 3256298596865604,
    447393122899, 651646838401572, 2538311371089956, 737032694307,
    29329, 43484162, 91358498, 374810899075,
    158485010, 178117478419, 88675058979, 433581536604804,
    158486962, 649105605635, 4866906995, 3220959471609924,
    649165714851, 3184943915608436, 570691368417972, 595804498035,
    124295042, 431498018963, 508238522371, 91518530,
    318240155763, 291789778348404, 1830001131721892, 375363605923,
    777781811075, 1136111028516116, 3097834205243396, 508001629971,
    2663607373704004, 680242583802939237, 333380770766129845, 179746658,
    42545, 138437538, 93365810, 713842853011,
    73602098, 69575510115, 23964357683, 868078761575828,
    28681778, 713778574611, 250912709379, 2323825233181284,
    302080811955, 3184439127991172, 1694042660682596, 796909779811,
    176306722, 150327278147, 619854856867, 1005252473234484,
    211025400963, 36712706, 360743481544788, 150627258963,
    117482600995, 1024968212107700, 2535169275963444, 4734473194086550421,
    628107696687956, 9399128243, 5198438490361643573, 194220594,
    104474994, 566996932387, 427920028243, 2014821863433780,
    492093858627, 147361150235284, 2005882975110676, 9671606099636618005,
    777701008947, 3185463219618820, 482784926917540, 2900953068249785909,
    1754182023747364, 4274848857537943333, 13198752741767688709, 2015093490989156,
    591272318771, 2659758091419812, 1531044293118596, 298306479155,
    408509245114388, 210504348563, 9248164405801223541, 91321106,
    2660352816454484, 680170263324308757, 8333659837799955077, 482966828984116,
    4274926723105633605, 3184439197724820, 192104450, 15217,
    45937, 129205250, 129208402, 529245952323,
    169097138, 770695537027, 382310500883, 2838550742137652,
    122763026, 277045793139, 81608128403, 1991870397907988,
    362778151475, 2059003085103236, 2132572377842852, 655681091891,
    58419234, 239280858627, 529092143139, 1568257451898804,
    447235128115, 679678845236084, 2167161349491220, 1554184567314086709,
    165479003923, 1428768988226596, 977710670185060, 10550024711307499077,
    1305410032576132, 11779770265620358997, 333446212255967269, 978168444447012,
    162736434, 35596216627, 138295313843, 891861543990356,
    692616541075, 3151866750863876, 100103641866564, 6572336607016932133,
    215036012883, 726936420696196, 52433666, 82160664963,
    2588613720361524, 5802089162353039525, 214799000387, 144876322,
    668013605731, 110616894681956, 1601657732871812, 430945547955,
    3156382366321172, 7644494644932993285, 3928124806469601813, 3155990846772900,
    339991010498708, 10743689387941597493, 5103845475, 105070898,
    3928064910068824213, 156265010, 1305138421793636, 27185,
    195459938, 567044449971, 382447549283, 2175279159592324,
    443529919251, 195059004769796, 2165424908404116, 1554158691063110021,
    504228368803, 1436350466655236, 27584723588724, 1900945754488837749,
    122971970, 443829749251, 302601798803, 108558722,
    724700725875, 43570095105972, 2295263717447940, 2860446751369014181,
    2165106202149444, 69275726195, 2860543885641537797, 2165106320445780,
    2280890014640004, 11820349930268368933, 8721082628082003989, 127050770,
    503707084675, 122834978, 2538193642857604, 10129,
    801441490467, 2923200302876740, 1443359556281892, 2901063790822564949,
    2728339631923524, 7103874718248233397, 12775311047932294245, 95520290,
    2623783208098404, 1900908618382410757, 137742672547, 2323440239468964,
    362478212387, 727199575803140, 73425410, 34337,
    163101314, 668566030659, 801204361987, 73030562,
    591509145619, 162574594, 100608342969108, 5553,
    724147968595, 1436604830452292, 176259090, 42001,
    143955266, 2385, 18433, 0,
];

#[cfg(test)]
mod tests {
    use super::*;
    use crate::grid::GridExtent;

    #[test]
    fn test_table_totality() {
        for config in 0..=255_u8 {
            let n = case_triangle_count(config);
            assert!(n <= MAX_TRIANGLES_PER_CELL, "case {config} has {n} triangles");
            assert_eq!(case_triangles(config).count(), n);
        }
        assert_eq!(case_triangle_count(0), 0);
        assert_eq!(case_triangle_count(255), 0);
        assert_eq!(case_triangle_count(1), 1);
    }

    #[test]
    fn test_table_edges_cross_the_surface() {
        for config in 0..=255_u8 {
            for tri in case_triangles(config) {
                for edge in tri {
                    let [a, b] = EDGE_CORNERS[edge];
                    let inside_a = config & (1 << a) != 0;
                    let inside_b = config & (1 << b) != 0;
                    assert_ne!(inside_a, inside_b, "case {config} uses non-crossing edge {edge}");
                }
            }
        }
    }

    #[test]
    fn test_table_words_split() {
        let words = case_table_words();
        assert_eq!(words.len(), 256);
        for (config, [lo, hi]) in words.iter().enumerate() {
            let entry = (u64::from(*hi) << 32) | u64::from(*lo);
            assert_eq!(entry, MC_TRIS[config]);
        }
    }

    #[test]
    fn test_configuration_bits() {
        let mut values = [0.0; 8];
        assert_eq!(cube_configuration(&values, 0.5), 0);
        values[0] = 1.0;
        values[7] = 1.0;
        assert_eq!(cube_configuration(&values, 0.5), 0b1000_0001);
        assert_eq!(cube_configuration(&[1.0; 8], 0.5), 255);
    }

    #[test]
    fn test_selector_field() {
        let sel = SurfaceSelector::default();
        assert_eq!(sel.field(Cell::ALIVE), 1.0);
        assert_eq!(sel.field(Cell::new(2, 0)), 0.0);
        let thr = SurfaceSelector::Threshold { iso: 1.5 };
        assert_eq!(thr.field(Cell::new(3, 0)), 3.0);
        assert_eq!(thr.iso(), 1.5);
    }

    #[test]
    fn test_single_inside_corner() {
        let extent = GridExtent::cubic(2).unwrap();
        let mut grid = CellGrid::new(extent);
        grid.set(0, 0, 0, Cell::ALIVE);
        let tris = polygonize_cell(&grid, SurfaceSelector::default(), 0, 0, 0);
        assert_eq!(tris.len(), 1);

        let tri = tris.as_slice()[0];
        for p in tri.positions {
            // Vertices sit at the midpoints of the three edges leaving corner 0.
            let on_axis = [p.x, p.y, p.z].iter().filter(|c| (**c - 0.5).abs() < 1e-6).count();
            assert_eq!(on_axis, 1, "vertex {p:?} is not an edge midpoint");
        }
        for n in tri.normals {
            assert!((n.length() - 1.0).abs() < 1e-5);
            // Normals point away from the inside corner.
            assert!(n.x >= 0.0 && n.y >= 0.0 && n.z >= 0.0, "normal {n:?}");
        }
    }

    #[test]
    fn test_uniform_cube_emits_nothing() {
        let extent = GridExtent::cubic(2).unwrap();
        let mut grid = CellGrid::new(extent);
        assert!(polygonize_cell(&grid, SurfaceSelector::default(), 0, 0, 0).is_empty());
        for cell in grid.cells_mut() {
            *cell = Cell::ALIVE;
        }
        assert!(polygonize_cell(&grid, SurfaceSelector::default(), 0, 0, 0).is_empty());
    }

    #[test]
    fn test_gradient_points_into_solid() {
        let extent = GridExtent::cubic(3).unwrap();
        let mut grid = CellGrid::new(extent);
        grid.set(1, 1, 1, Cell::ALIVE);
        let g = field_gradient(&grid, SurfaceSelector::default(), UVec3::new(0, 1, 1));
        assert_eq!(g, Vec3::new(0.5, 0.0, 0.0));
        let g = field_gradient(&grid, SurfaceSelector::default(), UVec3::new(1, 1, 1));
        assert_eq!(g, Vec3::ZERO);
    }
}
