use std::collections::HashMap;
use std::fs::File;
use std::io::{BufRead, BufReader};
use std::path::{Path, PathBuf};

use tracing::info;

use crate::error::{FloorplanError, Result};
use crate::model::{Block, Net, Rect, Terminal};

/// A parsed benchmark instance: blocks, terminals, netlist and the fixed
/// outline derived from the reference `.pl` placement. Immutable after load.
#[derive(Debug, Clone)]
pub struct Instance {
    name: String,
    blocks: Vec<Block>,
    terminals: Vec<Terminal>,
    nets: Vec<Net>,
    pin_count: usize,
    total_area: i64,
    fixed_width: i32,
    fixed_height: i32,
}

impl Instance {
    /// Loads `<stem>.blocks`, `<stem>.nets` and `<stem>.pl` given the path of
    /// the `.blocks` file.
    pub fn load(blocks_path: &Path) -> Result<Self> {
        let name = blocks_path
            .file_stem()
            .map(|s| s.to_string_lossy().into_owned())
            .unwrap_or_else(|| "instance".into());
        let nets_path = blocks_path.with_extension("nets");
        let pl_path = blocks_path.with_extension("pl");
        Self::from_readers(
            &name,
            BufReader::new(File::open(blocks_path)?),
            blocks_path,
            BufReader::new(File::open(&nets_path)?),
            &nets_path,
            BufReader::new(File::open(&pl_path)?),
            &pl_path,
        )
    }

    /// Parses an instance from three readers; paths are only used in error
    /// messages.
    pub fn from_readers<B1, B2, B3>(
        name: &str,
        blocks: B1,
        blocks_path: &Path,
        nets: B2,
        nets_path: &Path,
        pl: B3,
        pl_path: &Path,
    ) -> Result<Self>
    where
        B1: BufRead,
        B2: BufRead,
        B3: BufRead,
    {
        let mut ins = Instance {
            name: name.to_string(),
            blocks: Vec::new(),
            terminals: Vec::new(),
            nets: Vec::new(),
            pin_count: 0,
            total_area: 0,
            fixed_width: 0,
            fixed_height: 0,
        };
        ins.read_blocks(Scanner::new(blocks, blocks_path))?;
        ins.read_nets(Scanner::new(nets, nets_path))?;
        ins.read_pl(Scanner::new(pl, pl_path))?;
        info!(
            instance = %ins.name,
            blocks = ins.blocks.len(),
            terminals = ins.terminals.len(),
            nets = ins.nets.len(),
            pins = ins.pin_count,
            total_area = ins.total_area,
            outline = format!("{}x{}", ins.fixed_width, ins.fixed_height),
            "instance loaded"
        );
        Ok(ins)
    }

    pub fn name(&self) -> &str {
        &self.name
    }
    pub fn blocks(&self) -> &[Block] {
        &self.blocks
    }
    pub fn terminals(&self) -> &[Terminal] {
        &self.terminals
    }
    pub fn nets(&self) -> &[Net] {
        &self.nets
    }
    pub fn block_count(&self) -> usize {
        self.blocks.len()
    }
    pub fn net_count(&self) -> usize {
        self.nets.len()
    }
    pub fn pin_count(&self) -> usize {
        self.pin_count
    }
    pub fn total_area(&self) -> i64 {
        self.total_area
    }
    pub fn fixed_width(&self) -> i32 {
        self.fixed_width
    }
    pub fn fixed_height(&self) -> i32 {
        self.fixed_height
    }

    /// Source rect list for the packers, canonicalized to `width <= height`
    /// so rotation handling never has to consider both encodings.
    pub fn rects(&self) -> Vec<Rect> {
        self.blocks
            .iter()
            .enumerate()
            .map(|(i, b)| {
                Rect::new(
                    i,
                    b.x,
                    b.y,
                    b.width.min(b.height),
                    b.width.max(b.height),
                )
            })
            .collect()
    }

    /// Area/fill/HPWL of the reference `.pl` placement, for comparison rows.
    pub fn reference_report(&self) -> ReferenceReport {
        let mut bin_w = 0i32;
        let mut bin_h = 0i32;
        for b in &self.blocks {
            bin_w = bin_w.max(b.x + b.width);
            bin_h = bin_h.max(b.y + b.height);
        }
        let area = bin_w as i64 * bin_h as i64;

        let mut hpwl_block = 0.0;
        let mut hpwl_terminal = 0.0;
        for net in &self.nets {
            let mut min_x = f64::MAX;
            let mut max_x = 0.0f64;
            let mut min_y = f64::MAX;
            let mut max_y = 0.0f64;
            for &b in &net.blocks {
                let blk = &self.blocks[b];
                let pin_x = blk.x as f64 + blk.width as f64 * 0.5;
                let pin_y = blk.y as f64 + blk.height as f64 * 0.5;
                min_x = min_x.min(pin_x);
                max_x = max_x.max(pin_x);
                min_y = min_y.min(pin_y);
                max_y = max_y.max(pin_y);
            }
            if !net.blocks.is_empty() {
                hpwl_block += (max_x - min_x) + (max_y - min_y);
            }
            for &t in &net.terminals {
                let term = &self.terminals[t];
                min_x = min_x.min(term.x as f64);
                max_x = max_x.max(term.x as f64);
                min_y = min_y.min(term.y as f64);
                max_y = max_y.max(term.y as f64);
            }
            hpwl_terminal += (max_x - min_x) + (max_y - min_y);
        }

        ReferenceReport {
            area,
            fill_ratio: if area > 0 {
                self.total_area as f64 / area as f64
            } else {
                0.0
            },
            hpwl_block,
            hpwl_terminal,
        }
    }

    fn read_blocks<B: BufRead>(&mut self, mut sc: Scanner<B>) -> Result<()> {
        sc.skip(6)?;
        let block_count = sc.expect_count("NumHardRectilinearBlocks")?;
        let terminal_count = sc.expect_count("NumTerminals")?;

        self.blocks.reserve(block_count);
        for _ in 0..block_count {
            let line = sc.expect_line("block definition")?;
            // `<name> hardrectilinear 4 (x1,y1) (x2,y2) (x3,y3) (x4,y4)`;
            // width/height come from the third corner.
            let cleaned: String = line
                .chars()
                .map(|c| if matches!(c, '(' | ')' | ',') { ' ' } else { c })
                .collect();
            let tokens: Vec<&str> = cleaned.split_whitespace().collect();
            if tokens.len() < 11 || tokens[1] != "hardrectilinear" {
                return Err(sc.error(format!("malformed block line: '{}'", line.trim())));
            }
            let width: i32 = tokens[7]
                .parse()
                .map_err(|_| sc.error(format!("bad block width '{}'", tokens[7])))?;
            let height: i32 = tokens[8]
                .parse()
                .map_err(|_| sc.error(format!("bad block height '{}'", tokens[8])))?;
            let area = width as i64 * height as i64;
            self.total_area += area;
            self.blocks.push(Block {
                name: tokens[0].to_string(),
                width,
                height,
                area,
                x: 0,
                y: 0,
                net_ids: Vec::new(),
            });
        }

        self.terminals.reserve(terminal_count);
        for _ in 0..terminal_count {
            let line = sc.expect_line("terminal definition")?;
            let mut tokens = line.split_whitespace();
            let name = tokens
                .next()
                .ok_or_else(|| sc.error("empty terminal line".into()))?;
            self.terminals.push(Terminal {
                name: name.to_string(),
                x: 0,
                y: 0,
                net_ids: Vec::new(),
            });
        }
        Ok(())
    }

    fn read_nets<B: BufRead>(&mut self, mut sc: Scanner<B>) -> Result<()> {
        let block_index: HashMap<String, usize> = self
            .blocks
            .iter()
            .enumerate()
            .map(|(i, b)| (b.name.clone(), i))
            .collect();
        let terminal_index: HashMap<String, usize> = self
            .terminals
            .iter()
            .enumerate()
            .map(|(i, t)| (t.name.clone(), i))
            .collect();

        sc.skip(5)?;
        let net_count = sc.expect_count("NumNets")?;
        self.pin_count = sc.expect_count("NumPins")?;

        self.nets.reserve(net_count);
        for nid in 0..net_count {
            let degree = sc.expect_count("NetDegree")?;
            let mut net = Net {
                degree,
                blocks: Vec::new(),
                terminals: Vec::new(),
            };
            let mut members = 0;
            while members < degree {
                let line = sc.expect_line("net member")?;
                // Comment lines do not count toward the degree.
                if line.trim_start().starts_with('#') {
                    continue;
                }
                let name = line
                    .split_whitespace()
                    .next()
                    .ok_or_else(|| sc.error("empty net member line".into()))?;
                if let Some(&b) = block_index.get(name) {
                    net.blocks.push(b);
                    self.blocks[b].net_ids.push(nid);
                } else if let Some(&t) = terminal_index.get(name) {
                    net.terminals.push(t);
                    self.terminals[t].net_ids.push(nid);
                } else {
                    return Err(sc.error(format!("net {} references unknown member '{}'", nid, name)));
                }
                members += 1;
            }
            self.nets.push(net);
        }
        Ok(())
    }

    fn read_pl<B: BufRead>(&mut self, mut sc: Scanner<B>) -> Result<()> {
        let block_index: HashMap<String, usize> = self
            .blocks
            .iter()
            .enumerate()
            .map(|(i, b)| (b.name.clone(), i))
            .collect();
        let terminal_index: HashMap<String, usize> = self
            .terminals
            .iter()
            .enumerate()
            .map(|(i, t)| (t.name.clone(), i))
            .collect();

        sc.skip(5)?;
        while let Some(line) = sc.next_content()? {
            let mut tokens = line.split_whitespace();
            let name = match tokens.next() {
                Some(n) => n,
                None => continue,
            };
            let x: i32 = match tokens.next().map(str::parse) {
                Some(Ok(v)) => v,
                _ => return Err(sc.error(format!("malformed placement line: '{}'", line.trim()))),
            };
            let y: i32 = match tokens.next().map(str::parse) {
                Some(Ok(v)) => v,
                _ => return Err(sc.error(format!("malformed placement line: '{}'", line.trim()))),
            };
            if let Some(&b) = block_index.get(name) {
                self.blocks[b].x = x;
                self.blocks[b].y = y;
            } else if let Some(&t) = terminal_index.get(name) {
                self.terminals[t].x = x;
                self.terminals[t].y = y;
            } else {
                return Err(sc.error(format!("placement for unknown member '{}'", name)));
            }
            self.fixed_width = self.fixed_width.max(x);
            self.fixed_height = self.fixed_height.max(y);
        }
        Ok(())
    }
}

/// Summary of the input `.pl` placement.
#[derive(Debug, Clone, Copy)]
pub struct ReferenceReport {
    pub area: i64,
    pub fill_ratio: f64,
    pub hpwl_block: f64,
    pub hpwl_terminal: f64,
}

/// Line reader that tracks position for error reporting.
struct Scanner<B> {
    reader: B,
    path: PathBuf,
    line: usize,
}

impl<B: BufRead> Scanner<B> {
    fn new(reader: B, path: &Path) -> Self {
        Self {
            reader,
            path: path.to_path_buf(),
            line: 0,
        }
    }

    fn error(&self, msg: String) -> FloorplanError {
        FloorplanError::Parse {
            path: self.path.clone(),
            line: self.line,
            msg,
        }
    }

    fn next_raw(&mut self) -> Result<Option<String>> {
        let mut buf = String::new();
        let n = self.reader.read_line(&mut buf)?;
        if n == 0 {
            return Ok(None);
        }
        self.line += 1;
        Ok(Some(buf))
    }

    /// Skips `n` raw lines (headers); running out early is tolerated so that
    /// header-light files still parse.
    fn skip(&mut self, n: usize) -> Result<()> {
        for _ in 0..n {
            if self.next_raw()?.is_none() {
                break;
            }
        }
        Ok(())
    }

    /// Next non-blank line.
    fn next_content(&mut self) -> Result<Option<String>> {
        while let Some(line) = self.next_raw()? {
            if !line.trim().is_empty() {
                return Ok(Some(line));
            }
        }
        Ok(None)
    }

    fn expect_line(&mut self, what: &str) -> Result<String> {
        self.next_content()?
            .ok_or_else(|| self.error(format!("unexpected end of file, expected {}", what)))
    }

    /// Reads a `<key> : <count>` line.
    fn expect_count(&mut self, key: &str) -> Result<usize> {
        let line = self.expect_line(key)?;
        let (lhs, rhs) = line
            .split_once(':')
            .ok_or_else(|| self.error(format!("expected '{} : <count>'", key)))?;
        if !lhs.contains(key) {
            return Err(self.error(format!("expected '{}', found '{}'", key, lhs.trim())));
        }
        rhs.trim()
            .parse()
            .map_err(|_| self.error(format!("bad count for '{}': '{}'", key, rhs.trim())))
    }
}
