//! Binary encode/decode for the checkpoint format.
//!
//! All integers are little-endian. Collections are length-prefixed with a
//! `u32` count. The format is intentionally simple: no compression, no
//! alignment padding, no self-describing schema.

use std::io::{Read, Write};

use glam::DVec3;
use nidus_core::{ComplexId, MolId, RngState, SpeciesIdx, TemplateId};
use nidus_model::{BoundPartner, Complex, Interface, Molecule, TrajStatus};
use nidus_tables::{PairDump, PairParams, TableDump, TableEntry};
use smallvec::SmallVec;

use crate::error::CheckpointError;
use crate::snapshot::{ReservoirState, Snapshot};
use crate::{FORMAT_VERSION, MAGIC};

// ── Primitive writers ───────────────────────────────────────────

pub(crate) fn write_u8(w: &mut dyn Write, v: u8) -> Result<(), CheckpointError> {
    w.write_all(&[v])?;
    Ok(())
}

pub(crate) fn write_u32_le(w: &mut dyn Write, v: u32) -> Result<(), CheckpointError> {
    w.write_all(&v.to_le_bytes())?;
    Ok(())
}

pub(crate) fn write_u64_le(w: &mut dyn Write, v: u64) -> Result<(), CheckpointError> {
    w.write_all(&v.to_le_bytes())?;
    Ok(())
}

pub(crate) fn write_f64_le(w: &mut dyn Write, v: f64) -> Result<(), CheckpointError> {
    w.write_all(&v.to_le_bytes())?;
    Ok(())
}

fn write_bool(w: &mut dyn Write, v: bool) -> Result<(), CheckpointError> {
    write_u8(w, u8::from(v))
}

fn write_vec3(w: &mut dyn Write, v: DVec3) -> Result<(), CheckpointError> {
    write_f64_le(w, v.x)?;
    write_f64_le(w, v.y)?;
    write_f64_le(w, v.z)
}

// ── Primitive readers ───────────────────────────────────────────

pub(crate) fn read_u8(r: &mut dyn Read) -> Result<u8, CheckpointError> {
    let mut buf = [0u8; 1];
    r.read_exact(&mut buf)?;
    Ok(buf[0])
}

pub(crate) fn read_u32_le(r: &mut dyn Read) -> Result<u32, CheckpointError> {
    let mut buf = [0u8; 4];
    r.read_exact(&mut buf)?;
    Ok(u32::from_le_bytes(buf))
}

pub(crate) fn read_u64_le(r: &mut dyn Read) -> Result<u64, CheckpointError> {
    let mut buf = [0u8; 8];
    r.read_exact(&mut buf)?;
    Ok(u64::from_le_bytes(buf))
}

pub(crate) fn read_f64_le(r: &mut dyn Read) -> Result<f64, CheckpointError> {
    let mut buf = [0u8; 8];
    r.read_exact(&mut buf)?;
    Ok(f64::from_le_bytes(buf))
}

fn read_bool(r: &mut dyn Read) -> Result<bool, CheckpointError> {
    match read_u8(r)? {
        0 => Ok(false),
        1 => Ok(true),
        other => Err(CheckpointError::Malformed {
            detail: format!("boolean byte {other}"),
        }),
    }
}

fn read_vec3(r: &mut dyn Read) -> Result<DVec3, CheckpointError> {
    Ok(DVec3::new(read_f64_le(r)?, read_f64_le(r)?, read_f64_le(r)?))
}

fn read_count(r: &mut dyn Read) -> Result<usize, CheckpointError> {
    Ok(read_u32_le(r)? as usize)
}

// ── Record encode/decode ────────────────────────────────────────

fn encode_rng(w: &mut dyn Write, s: &RngState) -> Result<(), CheckpointError> {
    write_u64_le(w, s.seed)?;
    w.write_all(&s.key)?;
    write_u64_le(w, s.stream)?;
    write_u64_le(w, s.word_pos_hi)?;
    write_u64_le(w, s.word_pos_lo)?;
    write_u64_le(w, s.draws)
}

fn decode_rng(r: &mut dyn Read) -> Result<RngState, CheckpointError> {
    let seed = read_u64_le(r)?;
    let mut key = [0u8; 32];
    r.read_exact(&mut key)?;
    Ok(RngState {
        seed,
        key,
        stream: read_u64_le(r)?,
        word_pos_hi: read_u64_le(r)?,
        word_pos_lo: read_u64_le(r)?,
        draws: read_u64_le(r)?,
    })
}

fn encode_molecule(w: &mut dyn Write, m: &Molecule) -> Result<(), CheckpointError> {
    write_u32_le(w, m.id.0)?;
    write_u32_le(w, m.template.0)?;
    write_u32_le(w, m.complex.0)?;
    write_vec3(w, m.com)?;
    write_bool(w, m.is_empty)?;
    write_bool(w, m.is_implicit_lipid)?;
    write_u32_le(w, m.ifaces.len() as u32)?;
    for iface in &m.ifaces {
        write_vec3(w, iface.pos)?;
        write_u8(w, iface.state)?;
        write_u32_le(w, iface.species.0)?;
        match iface.bound {
            None => write_bool(w, false)?,
            Some(p) => {
                write_bool(w, true)?;
                write_u32_le(w, p.mol.0)?;
                write_u8(w, p.iface)?;
            }
        }
    }
    Ok(())
}

fn decode_molecule(r: &mut dyn Read) -> Result<Molecule, CheckpointError> {
    let id = MolId(read_u32_le(r)?);
    let template = TemplateId(read_u32_le(r)?);
    let complex = ComplexId(read_u32_le(r)?);
    let com = read_vec3(r)?;
    let is_empty = read_bool(r)?;
    let is_implicit_lipid = read_bool(r)?;
    let n = read_count(r)?;
    let mut ifaces = SmallVec::with_capacity(n);
    for _ in 0..n {
        let pos = read_vec3(r)?;
        let state = read_u8(r)?;
        let species = SpeciesIdx(read_u32_le(r)?);
        let bound = if read_bool(r)? {
            Some(BoundPartner {
                mol: MolId(read_u32_le(r)?),
                iface: read_u8(r)?,
            })
        } else {
            None
        };
        ifaces.push(Interface {
            pos,
            state,
            species,
            bound,
        });
    }
    Ok(Molecule {
        id,
        template,
        complex,
        com,
        ifaces,
        candidates: Vec::new(),
        traj_status: TrajStatus::None,
        is_empty,
        is_implicit_lipid,
        just_dissociated: false,
    })
}

fn encode_complex(w: &mut dyn Write, c: &Complex) -> Result<(), CheckpointError> {
    write_u32_le(w, c.id.0)?;
    write_u32_le(w, c.members.len() as u32)?;
    for m in &c.members {
        write_u32_le(w, m.0)?;
    }
    write_vec3(w, c.com)?;
    write_vec3(w, c.d_trans)?;
    write_vec3(w, c.d_rot)?;
    write_bool(w, c.is_empty)?;
    write_bool(w, c.on_surface)
}

fn decode_complex(r: &mut dyn Read) -> Result<Complex, CheckpointError> {
    let id = ComplexId(read_u32_le(r)?);
    let n = read_count(r)?;
    let mut members = Vec::with_capacity(n);
    for _ in 0..n {
        members.push(MolId(read_u32_le(r)?));
    }
    Ok(Complex {
        id,
        members,
        com: read_vec3(r)?,
        d_trans: read_vec3(r)?,
        d_rot: read_vec3(r)?,
        ncross: 0,
        traj_status: TrajStatus::None,
        traj_trans: DVec3::ZERO,
        traj_rot: DVec3::ZERO,
        is_empty: read_bool(r)?,
        on_surface: read_bool(r)?,
    })
}

fn encode_tables(w: &mut dyn Write, t: &TableDump) -> Result<(), CheckpointError> {
    write_u32_le(w, t.pairs.len() as u32)?;
    for p in &t.pairs {
        write_f64_le(w, p.params.d_tot)?;
        write_f64_le(w, p.params.ka)?;
        write_f64_le(w, p.params.sigma)?;
        write_f64_le(w, p.params.dt)?;
        write_f64_le(w, p.irr_radius)?;
        write_u32_le(w, p.bins.len() as u32)?;
        for (bin, e) in &p.bins {
            write_u32_le(w, *bin)?;
            write_f64_le(w, e.assoc_prob)?;
            write_f64_le(w, e.survival)?;
            write_f64_le(w, e.norm)?;
            write_f64_le(w, e.irr_radius)?;
        }
    }
    write_u64_le(w, t.solves)?;
    write_u64_le(w, t.clamped)
}

fn decode_tables(r: &mut dyn Read) -> Result<TableDump, CheckpointError> {
    let n = read_count(r)?;
    let mut pairs = Vec::with_capacity(n);
    for _ in 0..n {
        let params = PairParams {
            d_tot: read_f64_le(r)?,
            ka: read_f64_le(r)?,
            sigma: read_f64_le(r)?,
            dt: read_f64_le(r)?,
        };
        let irr_radius = read_f64_le(r)?;
        let bin_count = read_count(r)?;
        let mut bins = Vec::with_capacity(bin_count);
        for _ in 0..bin_count {
            let bin = read_u32_le(r)?;
            bins.push((
                bin,
                TableEntry {
                    assoc_prob: read_f64_le(r)?,
                    survival: read_f64_le(r)?,
                    norm: read_f64_le(r)?,
                    irr_radius: read_f64_le(r)?,
                },
            ));
        }
        pairs.push(PairDump {
            params,
            irr_radius,
            bins,
        });
    }
    Ok(TableDump {
        pairs,
        solves: read_u64_le(r)?,
        clamped: read_u64_le(r)?,
    })
}

// ── Snapshot encode/decode ──────────────────────────────────────

/// Write a full snapshot, header included.
pub fn write_snapshot(w: &mut dyn Write, s: &Snapshot) -> Result<(), CheckpointError> {
    w.write_all(&MAGIC)?;
    write_u8(w, FORMAT_VERSION)?;
    write_u64_le(w, s.step)?;
    encode_rng(w, &s.rng)?;

    write_u32_le(w, s.mol_slots.len() as u32)?;
    for m in &s.mol_slots {
        encode_molecule(w, m)?;
    }
    write_u32_le(w, s.mol_free.len() as u32)?;
    for id in &s.mol_free {
        write_u32_le(w, id.0)?;
    }
    write_u32_le(w, s.mol_generations.len() as u32)?;
    for g in &s.mol_generations {
        write_u32_le(w, *g)?;
    }

    write_u32_le(w, s.comp_slots.len() as u32)?;
    for c in &s.comp_slots {
        encode_complex(w, c)?;
    }
    write_u32_le(w, s.comp_free.len() as u32)?;
    for id in &s.comp_free {
        write_u32_le(w, id.0)?;
    }
    write_u32_le(w, s.comp_generations.len() as u32)?;
    for g in &s.comp_generations {
        write_u32_le(w, *g)?;
    }

    encode_tables(w, &s.tables)?;

    match &s.reservoir {
        None => write_u8(w, 0)?,
        Some(res) => {
            write_u8(w, 1)?;
            write_u32_le(w, res.mol.0)?;
            write_u32_le(w, res.template.0)?;
            write_u64_le(w, res.total)?;
            write_u64_le(w, res.bound)?;
        }
    }
    Ok(())
}

/// Read a full snapshot, validating magic and version.
pub fn read_snapshot(r: &mut dyn Read) -> Result<Snapshot, CheckpointError> {
    let mut magic = [0u8; 4];
    r.read_exact(&mut magic)?;
    if magic != MAGIC {
        return Err(CheckpointError::InvalidMagic);
    }
    let version = read_u8(r)?;
    if version != FORMAT_VERSION {
        return Err(CheckpointError::UnsupportedVersion { found: version });
    }
    let step = read_u64_le(r)?;
    let rng = decode_rng(r)?;

    let n = read_count(r)?;
    let mut mol_slots = Vec::with_capacity(n);
    for _ in 0..n {
        mol_slots.push(decode_molecule(r)?);
    }
    let n = read_count(r)?;
    let mut mol_free = Vec::with_capacity(n);
    for _ in 0..n {
        mol_free.push(MolId(read_u32_le(r)?));
    }
    let n = read_count(r)?;
    let mut mol_generations = Vec::with_capacity(n);
    for _ in 0..n {
        mol_generations.push(read_u32_le(r)?);
    }

    let n = read_count(r)?;
    let mut comp_slots = Vec::with_capacity(n);
    for _ in 0..n {
        comp_slots.push(decode_complex(r)?);
    }
    let n = read_count(r)?;
    let mut comp_free = Vec::with_capacity(n);
    for _ in 0..n {
        comp_free.push(ComplexId(read_u32_le(r)?));
    }
    let n = read_count(r)?;
    let mut comp_generations = Vec::with_capacity(n);
    for _ in 0..n {
        comp_generations.push(read_u32_le(r)?);
    }
    if mol_generations.len() != mol_slots.len() || comp_generations.len() != comp_slots.len() {
        return Err(CheckpointError::Malformed {
            detail: "generation table length does not match slot count".into(),
        });
    }

    let tables = decode_tables(r)?;

    let reservoir = match read_u8(r)? {
        0 => None,
        1 => Some(ReservoirState {
            mol: MolId(read_u32_le(r)?),
            template: TemplateId(read_u32_le(r)?),
            total: read_u64_le(r)?,
            bound: read_u64_le(r)?,
        }),
        other => {
            return Err(CheckpointError::Malformed {
                detail: format!("reservoir flag byte {other}"),
            })
        }
    };

    Ok(Snapshot {
        step,
        rng,
        mol_slots,
        mol_free,
        mol_generations,
        comp_slots,
        comp_free,
        comp_generations,
        tables,
        reservoir,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use smallvec::smallvec;

    fn sample() -> Snapshot {
        let mol = Molecule {
            id: MolId(0),
            template: TemplateId(0),
            complex: ComplexId(0),
            com: DVec3::new(1.0, -2.0, 3.0),
            ifaces: smallvec![Interface {
                pos: DVec3::new(1.5, -2.0, 3.0),
                state: 1,
                species: SpeciesIdx(4),
                bound: Some(BoundPartner {
                    mol: MolId(1),
                    iface: 0,
                }),
            }],
            candidates: Vec::new(),
            traj_status: TrajStatus::None,
            is_empty: false,
            is_implicit_lipid: false,
            just_dissociated: false,
        };
        let comp = Complex {
            id: ComplexId(0),
            members: vec![MolId(0)],
            com: DVec3::new(1.0, -2.0, 3.0),
            d_trans: DVec3::splat(10.0),
            d_rot: DVec3::splat(0.1),
            ncross: 0,
            traj_status: TrajStatus::None,
            traj_trans: DVec3::ZERO,
            traj_rot: DVec3::ZERO,
            is_empty: false,
            on_surface: true,
        };
        Snapshot {
            step: 42,
            rng: RngState {
                seed: 7,
                key: [9u8; 32],
                stream: 0,
                word_pos_hi: 0,
                word_pos_lo: 1234,
                draws: 99,
            },
            mol_slots: vec![mol],
            mol_free: vec![],
            mol_generations: vec![0],
            comp_slots: vec![comp],
            comp_free: vec![],
            comp_generations: vec![0],
            tables: TableDump {
                pairs: vec![PairDump {
                    params: PairParams {
                        d_tot: 20.0,
                        ka: 100.0,
                        sigma: 1.0,
                        dt: 1e-6,
                    },
                    irr_radius: 0.6,
                    bins: vec![(
                        3,
                        TableEntry {
                            assoc_prob: 0.25,
                            survival: 0.75,
                            norm: 1.0,
                            irr_radius: 0.6,
                        },
                    )],
                }],
                solves: 1,
                clamped: 0,
            },
            reservoir: Some(ReservoirState {
                mol: MolId(0),
                template: TemplateId(1),
                total: 100,
                bound: 3,
            }),
        }
    }

    #[test]
    fn snapshot_round_trips_exactly() {
        let snap = sample();
        let mut buf = Vec::new();
        write_snapshot(&mut buf, &snap).unwrap();
        let decoded = read_snapshot(&mut buf.as_slice()).unwrap();
        assert_eq!(decoded, snap);
    }

    #[test]
    fn wrong_magic_is_rejected() {
        let snap = sample();
        let mut buf = Vec::new();
        write_snapshot(&mut buf, &snap).unwrap();
        buf[0] = b'X';
        assert!(matches!(
            read_snapshot(&mut buf.as_slice()),
            Err(CheckpointError::InvalidMagic)
        ));
    }

    #[test]
    fn future_version_is_rejected() {
        let snap = sample();
        let mut buf = Vec::new();
        write_snapshot(&mut buf, &snap).unwrap();
        buf[4] = FORMAT_VERSION + 1;
        assert!(matches!(
            read_snapshot(&mut buf.as_slice()),
            Err(CheckpointError::UnsupportedVersion { .. })
        ));
    }

    #[test]
    fn truncation_is_an_io_error() {
        let snap = sample();
        let mut buf = Vec::new();
        write_snapshot(&mut buf, &snap).unwrap();
        buf.truncate(buf.len() / 2);
        assert!(matches!(
            read_snapshot(&mut buf.as_slice()),
            Err(CheckpointError::Io(_))
        ));
    }

    #[test]
    fn step_verification() {
        let snap = sample();
        assert!(snap.verify_step(42).is_ok());
        assert!(matches!(
            snap.verify_step(41),
            Err(CheckpointError::StepMismatch {
                expected: 41,
                found: 42
            })
        ));
    }
}
