//! VRPLIB reader and writer.
//!
//! Header lines are `KEY : VALUE`. Data sections start with their keyword on
//! a line of its own and run until the next keyword or `EOF`.
//!
//! | Key / section | Meaning |
//! |---|---|
//! | `NAME`, `COMMENT` | free-form |
//! | `TYPE` | must be `CVRP` |
//! | `DIMENSION` | number of nodes, depot included |
//! | `VEHICLES` | declared fleet size |
//! | `CAPACITY` | vehicle capacity, positive |
//! | `EDGE_WEIGHT_TYPE` | `EUC_2D`, or `EXPLICIT` together with `UPPER_ROW` |
//! | `EDGE_WEIGHT_FORMAT` | `FUNCTION` (default) or `UPPER_ROW` |
//! | `NODE_COORD_SECTION` | `i x y`, 1-indexed |
//! | `DEMAND_SECTION` | `i demand` |
//! | `PROFIT_SECTION` | `i profit` (optional, defaults to 0) |
//! | `DEPOT_SECTION` | depot ids terminated by `-1`; must be exactly `1` |
//! | `EDGE_WEIGHT_SECTION` | packed upper triangle, needed for `UPPER_ROW` |

use std::fs;
use std::io::Write;
use std::path::Path;

use super::numbers::{parse_f64, parse_i32, parse_usize};
use crate::distance::num_pairs;
use crate::error::{Error, Result};
use crate::models::{Instance, Point};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Section {
    Header,
    NodeCoord,
    Demand,
    Profit,
    Depot,
    EdgeWeight,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum WeightFormat {
    Function,
    UpperRow,
}

fn section_keyword(line: &str) -> Option<Section> {
    let keyword = line.trim_end_matches(':').trim();
    match keyword {
        "NODE_COORD_SECTION" => Some(Section::NodeCoord),
        "DEMAND_SECTION" => Some(Section::Demand),
        "PROFIT_SECTION" => Some(Section::Profit),
        "DEPOT_SECTION" => Some(Section::Depot),
        "EDGE_WEIGHT_SECTION" => Some(Section::EdgeWeight),
        _ => None,
    }
}

/// Accumulates header values and section rows while scanning.
struct VrplibReader<'a> {
    path: &'a Path,
    line: usize,
    name: String,
    comment: String,
    dimension: Option<usize>,
    vehicles: usize,
    capacity: Option<f64>,
    explicit: bool,
    format: WeightFormat,
    positions: Vec<Option<Point>>,
    demands: Vec<Option<f64>>,
    profits: Vec<Option<f64>>,
    depots: Vec<usize>,
    depot_closed: bool,
    weights: Vec<f64>,
}

impl<'a> VrplibReader<'a> {
    fn new(path: &'a Path) -> Self {
        Self {
            path,
            line: 0,
            name: String::new(),
            comment: String::new(),
            dimension: None,
            vehicles: 1,
            capacity: None,
            explicit: false,
            format: WeightFormat::Function,
            positions: Vec::new(),
            demands: Vec::new(),
            profits: Vec::new(),
            depots: Vec::new(),
            depot_closed: false,
            weights: Vec::new(),
        }
    }

    fn err(&self, message: impl Into<String>) -> Error {
        Error::parse(self.path, self.line, message)
    }

    fn header(&mut self, key: &str, value: &str) -> Result<()> {
        match key {
            "NAME" => self.name = value.to_string(),
            "COMMENT" => self.comment = value.to_string(),
            "TYPE" => {
                if value != "CVRP" {
                    return Err(self.err(format!("unsupported TYPE `{value}`")));
                }
            }
            "DIMENSION" => {
                let n = parse_usize(value)
                    .filter(|n| *n >= 1)
                    .ok_or_else(|| self.err(format!("invalid DIMENSION `{value}`")))?;
                self.dimension = Some(n);
                self.positions = vec![None; n];
                self.demands = vec![None; n];
                self.profits = vec![None; n];
            }
            "VEHICLES" => {
                self.vehicles = parse_usize(value)
                    .ok_or_else(|| self.err(format!("invalid VEHICLES `{value}`")))?;
            }
            "CAPACITY" => {
                let q = parse_f64(value)
                    .filter(|q| q.is_finite() && *q > 0.0)
                    .ok_or_else(|| self.err(format!("invalid CAPACITY `{value}`")))?;
                self.capacity = Some(q);
            }
            "EDGE_WEIGHT_TYPE" => match value {
                "EUC_2D" => self.explicit = false,
                "EXPLICIT" => self.explicit = true,
                _ => {
                    return Err(self.err(format!("unsupported EDGE_WEIGHT_TYPE `{value}`")));
                }
            },
            "EDGE_WEIGHT_FORMAT" => {
                self.format = match value {
                    "FUNCTION" => WeightFormat::Function,
                    "UPPER_ROW" => WeightFormat::UpperRow,
                    _ => {
                        return Err(
                            self.err(format!("unsupported EDGE_WEIGHT_FORMAT `{value}`"))
                        );
                    }
                };
            }
            _ => log::warn!(
                "{}:{}: ignoring unknown key `{key}`",
                self.path.display(),
                self.line
            ),
        }
        Ok(())
    }

    fn dimension(&self) -> Result<usize> {
        self.dimension
            .ok_or_else(|| self.err("section found before DIMENSION"))
    }

    /// Parses a 1-based node id and returns the 0-based index.
    fn node_index(&self, token: Option<&str>) -> Result<usize> {
        let n = self.dimension()?;
        let token = token.ok_or_else(|| self.err("missing node id"))?;
        match parse_usize(token) {
            Some(i) if (1..=n).contains(&i) => Ok(i - 1),
            _ => Err(self.err(format!("node id `{token}` out of range 1..={n}"))),
        }
    }

    fn number(&self, token: Option<&str>, what: &str) -> Result<f64> {
        let token = token.ok_or_else(|| self.err(format!("missing {what}")))?;
        parse_f64(token).ok_or_else(|| self.err(format!("invalid {what} `{token}`")))
    }

    fn data(&mut self, section: Section, line: &str) -> Result<()> {
        let mut tokens = line.split_whitespace();
        match section {
            Section::Header => {
                return Err(self.err(format!("expected `KEY : VALUE`, found `{line}`")));
            }
            Section::NodeCoord => {
                let i = self.node_index(tokens.next())?;
                let x = self.number(tokens.next(), "x coordinate")?;
                let y = self.number(tokens.next(), "y coordinate")?;
                self.positions[i] = Some(Point::new(x, y));
            }
            Section::Demand => {
                let i = self.node_index(tokens.next())?;
                self.demands[i] = Some(self.number(tokens.next(), "demand")?);
            }
            Section::Profit => {
                let i = self.node_index(tokens.next())?;
                self.profits[i] = Some(self.number(tokens.next(), "profit")?);
            }
            Section::Depot => {
                for token in tokens {
                    if self.depot_closed {
                        return Err(self.err("data after DEPOT_SECTION terminator"));
                    }
                    match parse_i32(token) {
                        Some(-1) => self.depot_closed = true,
                        Some(d) if d >= 1 => self.depots.push(d as usize),
                        _ => return Err(self.err(format!("invalid depot id `{token}`"))),
                    }
                }
            }
            Section::EdgeWeight => {
                let expected = num_pairs(self.dimension()?);
                for token in tokens {
                    if self.weights.len() == expected {
                        return Err(self.err("too many edge weights"));
                    }
                    let w = parse_f64(token)
                        .ok_or_else(|| self.err(format!("invalid edge weight `{token}`")))?;
                    self.weights.push(w);
                }
            }
        }
        Ok(())
    }

    fn finish(self) -> Result<Instance> {
        let n = self.dimension()?;
        let capacity = self.capacity.ok_or_else(|| self.err("missing CAPACITY"))?;

        if self.depots != [1] {
            return Err(self.err(format!(
                "expected a single depot with id 1, found {:?}",
                self.depots
            )));
        }
        if !self.depot_closed {
            return Err(self.err("DEPOT_SECTION is not terminated by -1"));
        }

        let explicit_weights = match (self.explicit, self.format) {
            (_, WeightFormat::UpperRow) => {
                if self.weights.len() != num_pairs(n) {
                    return Err(self.err(format!(
                        "expected {} edge weights, found {}",
                        num_pairs(n),
                        self.weights.len()
                    )));
                }
                true
            }
            (true, WeightFormat::Function) => {
                return Err(self.err("EXPLICIT edge weights require UPPER_ROW format"));
            }
            (false, WeightFormat::Function) => false,
        };

        let mut positions = Vec::with_capacity(n);
        for (i, p) in self.positions.iter().enumerate() {
            match p {
                Some(p) => positions.push(*p),
                None if explicit_weights => positions.push(Point::default()),
                None => return Err(self.err(format!("missing coordinates of node {}", i + 1))),
            }
        }
        let mut demands = Vec::with_capacity(n);
        for (i, d) in self.demands.iter().enumerate() {
            demands.push(d.ok_or_else(|| self.err(format!("missing demand of node {}", i + 1)))?);
        }
        let profits = self.profits.iter().map(|p| p.unwrap_or(0.0)).collect();

        let instance = Instance::new(capacity, positions, demands, profits)?
            .with_name(self.name)
            .with_comment(self.comment)
            .with_num_vehicles(self.vehicles);
        if explicit_weights {
            instance.with_edge_weights(self.weights)
        } else {
            Ok(instance)
        }
    }
}

/// Parses VRPLIB text. `path` is only used in error messages.
///
/// # Examples
///
/// ```
/// use std::path::Path;
/// use u_cptp::parser::parse_vrplib_str;
///
/// let text = "\
/// NAME : tiny
/// TYPE : CVRP
/// DIMENSION : 3
/// CAPACITY : 10
/// EDGE_WEIGHT_TYPE : EUC_2D
/// NODE_COORD_SECTION
/// 1 0 0
/// 2 3 0
/// 3 0 4
/// DEMAND_SECTION
/// 1 0
/// 2 4
/// 3 5
/// PROFIT_SECTION
/// 1 0
/// 2 8
/// 3 9
/// DEPOT_SECTION
/// 1
/// -1
/// EOF
/// ";
/// let inst = parse_vrplib_str(text, Path::new("tiny.vrp")).unwrap();
/// assert_eq!(inst.num_customers(), 2);
/// assert_eq!(inst.profit(2), 9.0);
/// ```
pub fn parse_vrplib_str(text: &str, path: &Path) -> Result<Instance> {
    let mut reader = VrplibReader::new(path);
    let mut section = Section::Header;

    for (lineno, raw) in text.lines().enumerate() {
        reader.line = lineno + 1;
        let line = raw.trim();
        if line.is_empty() {
            continue;
        }
        if line == "EOF" {
            break;
        }
        if let Some(next) = section_keyword(line) {
            reader.dimension()?;
            section = next;
            continue;
        }
        if let Some((key, value)) = line.split_once(':') {
            let key = key.trim();
            if key.chars().all(|c| c.is_ascii_uppercase() || c == '_') && !key.is_empty() {
                section = Section::Header;
                reader.header(key, value.trim())?;
                continue;
            }
        }
        reader.data(section, line)?;
    }
    reader.finish()
}

/// Reads and parses a VRPLIB file.
pub fn parse_vrplib(path: impl AsRef<Path>) -> Result<Instance> {
    let path = path.as_ref();
    let text = fs::read_to_string(path)?;
    parse_vrplib_str(&text, path)
}

/// Writes `instance` in the format read by [`parse_vrplib_str`].
pub fn write_vrplib<W: Write>(instance: &Instance, mut out: W) -> Result<()> {
    let n = instance.num_nodes();
    let name = if instance.name().is_empty() {
        "VRP unnamed instance"
    } else {
        instance.name()
    };
    writeln!(out, "NAME : {name}")?;
    if !instance.comment().is_empty() {
        writeln!(out, "COMMENT : {}", instance.comment())?;
    }
    writeln!(out, "TYPE : CVRP")?;
    writeln!(out, "DIMENSION : {n}")?;
    writeln!(out, "VEHICLES : {}", instance.num_vehicles())?;
    writeln!(out, "CAPACITY : {}", instance.vehicle_cap())?;
    match instance.edge_weights() {
        None => {
            writeln!(out, "EDGE_WEIGHT_FORMAT : FUNCTION")?;
            writeln!(out, "EDGE_WEIGHT_TYPE : EUC_2D")?;
        }
        Some(_) => {
            writeln!(out, "EDGE_WEIGHT_FORMAT : UPPER_ROW")?;
            writeln!(out, "EDGE_WEIGHT_TYPE : EXPLICIT")?;
        }
    }

    writeln!(out, "NODE_COORD_SECTION")?;
    for (i, p) in instance.positions().iter().enumerate() {
        writeln!(out, "{} {} {}", i + 1, p.x, p.y)?;
    }
    writeln!(out, "DEMAND_SECTION")?;
    for (i, d) in instance.demands().iter().enumerate() {
        writeln!(out, "{} {}", i + 1, d)?;
    }
    writeln!(out, "PROFIT_SECTION")?;
    for (i, p) in instance.profits().iter().enumerate() {
        writeln!(out, "{} {}", i + 1, p)?;
    }
    if let Some(weights) = instance.edge_weights() {
        writeln!(out, "EDGE_WEIGHT_SECTION")?;
        let mut k = 0;
        for i in 0..n {
            let row = n - i - 1;
            if row == 0 {
                continue;
            }
            let line: Vec<String> = weights[k..k + row].iter().map(|w| w.to_string()).collect();
            writeln!(out, "{}", line.join(" "))?;
            k += row;
        }
    }
    writeln!(out, "DEPOT_SECTION")?;
    writeln!(out, "1")?;
    writeln!(out, "-1")?;
    writeln!(out, "EOF")?;
    Ok(())
}

/// Writes `instance` to a VRPLIB file.
pub fn write_vrplib_file(instance: &Instance, path: impl AsRef<Path>) -> Result<()> {
    let file = fs::File::create(path)?;
    write_vrplib(instance, std::io::BufWriter::new(file))
}
