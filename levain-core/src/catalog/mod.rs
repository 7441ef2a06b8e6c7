//! Program catalog
//!
//! Holds the ordered set of baking programs. Every load or replace is
//! validated in full before the swap, so a rejected catalog never
//! disturbs the one already in place.

pub mod draft;
pub mod types;

use core::fmt;

use heapless::{String, Vec};

pub use draft::{MixActionDraft, ProgramDraft, StageDraft};
pub use types::*;

/// Catalog validation failures
///
/// Indices refer to the position in the submitted sequence.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum ValidationError {
    /// More programs than the catalog can hold
    TooManyPrograms { count: usize },
    /// Program has more than [`MAX_STAGES`] stages
    TooManyStages { program: usize, count: usize },
    /// Stage has more than [`MAX_MIX_ACTIONS`] mix actions
    TooManyMixActions {
        program: usize,
        stage: usize,
        count: usize,
    },
    NameTooLong { program: usize, len: usize },
    NotesTooLong { program: usize, len: usize },
    IconTooLong { program: usize, len: usize },
    LabelTooLong {
        program: usize,
        stage: usize,
        len: usize,
    },
    InstructionsTooLong {
        program: usize,
        stage: usize,
        len: usize,
    },
    /// Negative planned stage duration
    NegativeDuration { program: usize, stage: usize },
    /// Negative mix action duration
    NegativeMixDuration {
        program: usize,
        stage: usize,
        action: usize,
    },
    /// Duration does not fit the stored representation
    DurationOutOfRange { program: usize, stage: usize },
    /// Two programs share an id
    DuplicateId { id: i32 },
    /// Q10 not positive, or baseline not a finite temperature
    InvalidFermentModel { program: usize },
    /// Target temperature is not finite
    InvalidTemperature { program: usize, stage: usize },
}

impl fmt::Display for ValidationError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        use ValidationError::*;
        match *self {
            TooManyPrograms { count } => {
                write!(f, "{count} programs exceeds the limit of {MAX_PROGRAMS}")
            }
            TooManyStages { program, count } => write!(
                f,
                "program {program}: {count} stages exceeds the limit of {MAX_STAGES}"
            ),
            TooManyMixActions {
                program,
                stage,
                count,
            } => write!(
                f,
                "program {program} stage {stage}: {count} mix actions exceeds the limit of {MAX_MIX_ACTIONS}"
            ),
            NameTooLong { program, len } => write!(
                f,
                "program {program}: name is {len} bytes, limit is {MAX_NAME_LEN}"
            ),
            NotesTooLong { program, len } => write!(
                f,
                "program {program}: notes are {len} bytes, limit is {MAX_NOTES_LEN}"
            ),
            IconTooLong { program, len } => write!(
                f,
                "program {program}: icon is {len} bytes, limit is {MAX_ICON_LEN}"
            ),
            LabelTooLong {
                program,
                stage,
                len,
            } => write!(
                f,
                "program {program} stage {stage}: label is {len} bytes, limit is {MAX_LABEL_LEN}"
            ),
            InstructionsTooLong {
                program,
                stage,
                len,
            } => write!(
                f,
                "program {program} stage {stage}: instructions are {len} bytes, limit is {MAX_INSTRUCTIONS_LEN}"
            ),
            NegativeDuration { program, stage } => {
                write!(f, "program {program} stage {stage}: negative duration")
            }
            NegativeMixDuration {
                program,
                stage,
                action,
            } => write!(
                f,
                "program {program} stage {stage} mix action {action}: negative duration"
            ),
            DurationOutOfRange { program, stage } => {
                write!(f, "program {program} stage {stage}: duration out of range")
            }
            DuplicateId { id } => write!(f, "duplicate program id {id}"),
            InvalidFermentModel { program } => {
                write!(f, "program {program}: invalid fermentation model")
            }
            InvalidTemperature { program, stage } => {
                write!(f, "program {program} stage {stage}: invalid target temperature")
            }
        }
    }
}

/// Program/stage selection failures
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum SelectionError {
    /// No program at this index
    UnknownIndex(usize),
    /// No program with this name
    UnknownName,
    /// No program with this id
    UnknownId(i32),
    /// Start requested without a selected program
    NothingSelected,
    /// Program has no stages to run
    NoStages(usize),
    /// Requested start stage does not exist
    StageOutOfRange { stage: usize, count: usize },
}

impl fmt::Display for SelectionError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match *self {
            SelectionError::UnknownIndex(index) => write!(f, "no program at index {index}"),
            SelectionError::UnknownName => f.write_str("no program with that name"),
            SelectionError::UnknownId(id) => write!(f, "no program with id {id}"),
            SelectionError::NothingSelected => f.write_str("no program selected"),
            SelectionError::NoStages(index) => write!(f, "program {index} has no stages"),
            SelectionError::StageOutOfRange { stage, count } => write!(
                f,
                "stage {stage} out of range, program has {count} stages"
            ),
        }
    }
}

/// Validated, ordered program collection
#[derive(Debug, Clone, Default)]
pub struct ProgramCatalog {
    programs: Vec<Program, MAX_PROGRAMS>,
    /// Incremented on every successful load/replace
    generation: u32,
}

impl ProgramCatalog {
    /// Create an empty catalog
    pub const fn new() -> Self {
        Self {
            programs: Vec::new(),
            generation: 0,
        }
    }

    /// Load programs, replacing whatever was there
    pub fn load(&mut self, drafts: &[ProgramDraft<'_>]) -> Result<(), ValidationError> {
        self.replace(drafts).map(|_| ())
    }

    /// Validate and swap in a new set of programs
    ///
    /// Returns the new catalog generation. On error the current programs
    /// are left untouched.
    pub fn replace(&mut self, drafts: &[ProgramDraft<'_>]) -> Result<u32, ValidationError> {
        let programs = Self::validate(drafts).inspect_err(|e| {
            warn!("Catalog rejected: {:?}", e);
        })?;
        Ok(self.install(programs))
    }

    /// Swap in programs that were validated elsewhere
    ///
    /// Lets callers run [`ProgramCatalog::validate`] outside any lock and
    /// keep the critical section down to the swap itself.
    pub fn install(&mut self, programs: Vec<Program, MAX_PROGRAMS>) -> u32 {
        self.programs = programs;
        self.generation = self.generation.wrapping_add(1);
        info!(
            "Catalog generation {} installed with {} programs",
            self.generation,
            self.programs.len()
        );
        self.generation
    }

    /// Validate drafts into programs without touching any catalog
    pub fn validate(
        drafts: &[ProgramDraft<'_>],
    ) -> Result<Vec<Program, MAX_PROGRAMS>, ValidationError> {
        if drafts.len() > MAX_PROGRAMS {
            return Err(ValidationError::TooManyPrograms {
                count: drafts.len(),
            });
        }

        let mut programs = Vec::new();
        for (index, draft) in drafts.iter().enumerate() {
            if drafts[..index].iter().any(|p| p.id == draft.id) {
                return Err(ValidationError::DuplicateId { id: draft.id });
            }
            let program = build_program(index, draft)?;
            programs
                .push(program)
                .map_err(|_| ValidationError::TooManyPrograms {
                    count: drafts.len(),
                })?;
        }
        Ok(programs)
    }

    /// Check already-typed programs against the rules their types can't
    /// express (unique ids, fermentation model, finite temperatures)
    pub fn check(programs: &[Program]) -> Result<(), ValidationError> {
        if programs.len() > MAX_PROGRAMS {
            return Err(ValidationError::TooManyPrograms {
                count: programs.len(),
            });
        }
        for (index, program) in programs.iter().enumerate() {
            if programs[..index].iter().any(|p| p.id == program.id) {
                return Err(ValidationError::DuplicateId { id: program.id });
            }
            if !program.ferment_q10.is_finite()
                || program.ferment_q10 <= 0.0
                || !program.ferment_baseline_c.is_finite()
            {
                return Err(ValidationError::InvalidFermentModel { program: index });
            }
            if let Some(stage) = program
                .stages
                .iter()
                .position(|s| !s.target_temp_c.is_finite())
            {
                return Err(ValidationError::InvalidTemperature {
                    program: index,
                    stage,
                });
            }
        }
        Ok(())
    }

    /// Get a program by index
    pub fn get(&self, index: usize) -> Result<&Program, SelectionError> {
        self.programs
            .get(index)
            .ok_or(SelectionError::UnknownIndex(index))
    }

    /// Find a program's index by exact name
    pub fn find_by_name(&self, name: &str) -> Result<usize, SelectionError> {
        self.programs
            .iter()
            .position(|p| p.name.as_str() == name)
            .ok_or(SelectionError::UnknownName)
    }

    /// Find a program's index by id
    pub fn find_by_id(&self, id: i32) -> Result<usize, SelectionError> {
        self.programs
            .iter()
            .position(|p| p.id == id)
            .ok_or(SelectionError::UnknownId(id))
    }

    /// Resolve a program that can run from `stage`
    pub fn resolve(&self, index: usize, stage: usize) -> Result<&Program, SelectionError> {
        let program = self.get(index)?;
        if program.stages.is_empty() {
            return Err(SelectionError::NoStages(index));
        }
        if stage >= program.stage_count() {
            return Err(SelectionError::StageOutOfRange {
                stage,
                count: program.stage_count(),
            });
        }
        Ok(program)
    }

    /// All programs in order
    pub fn programs(&self) -> &[Program] {
        &self.programs
    }

    pub fn len(&self) -> usize {
        self.programs.len()
    }

    pub fn is_empty(&self) -> bool {
        self.programs.is_empty()
    }

    /// Current generation (0 until the first load)
    pub fn generation(&self) -> u32 {
        self.generation
    }
}

/// Copy a string into fixed capacity, reporting overflow as `err`
fn bounded<const N: usize>(s: &str, err: ValidationError) -> Result<String<N>, ValidationError> {
    let mut out = String::new();
    out.push_str(s).map_err(|_| err)?;
    Ok(out)
}

fn build_program(index: usize, draft: &ProgramDraft<'_>) -> Result<Program, ValidationError> {
    let name = bounded(
        draft.name,
        ValidationError::NameTooLong {
            program: index,
            len: draft.name.len(),
        },
    )?;
    let notes = bounded(
        draft.notes,
        ValidationError::NotesTooLong {
            program: index,
            len: draft.notes.len(),
        },
    )?;
    let icon = bounded(
        draft.icon,
        ValidationError::IconTooLong {
            program: index,
            len: draft.icon.len(),
        },
    )?;

    if !draft.ferment_q10.is_finite()
        || draft.ferment_q10 <= 0.0
        || !draft.ferment_baseline_c.is_finite()
    {
        return Err(ValidationError::InvalidFermentModel { program: index });
    }

    if draft.stages.len() > MAX_STAGES {
        return Err(ValidationError::TooManyStages {
            program: index,
            count: draft.stages.len(),
        });
    }

    let mut stages = Vec::new();
    for (stage_index, stage) in draft.stages.iter().enumerate() {
        let stage = build_stage(index, stage_index, stage)?;
        stages
            .push(stage)
            .map_err(|_| ValidationError::TooManyStages {
                program: index,
                count: draft.stages.len(),
            })?;
    }

    Ok(Program {
        id: draft.id,
        name,
        notes,
        icon,
        ferment_baseline_c: draft.ferment_baseline_c,
        ferment_q10: draft.ferment_q10,
        stages,
    })
}

fn build_stage(
    program: usize,
    stage: usize,
    draft: &StageDraft<'_>,
) -> Result<Stage, ValidationError> {
    let label = bounded(
        draft.label,
        ValidationError::LabelTooLong {
            program,
            stage,
            len: draft.label.len(),
        },
    )?;
    let instructions = bounded(
        draft.instructions,
        ValidationError::InstructionsTooLong {
            program,
            stage,
            len: draft.instructions.len(),
        },
    )?;

    if draft.planned_min < 0 {
        return Err(ValidationError::NegativeDuration { program, stage });
    }
    let planned_min = u32::try_from(draft.planned_min)
        .map_err(|_| ValidationError::DurationOutOfRange { program, stage })?;

    if !draft.target_temp_c.is_finite() {
        return Err(ValidationError::InvalidTemperature { program, stage });
    }

    if draft.mix_pattern.len() > MAX_MIX_ACTIONS {
        return Err(ValidationError::TooManyMixActions {
            program,
            stage,
            count: draft.mix_pattern.len(),
        });
    }

    let mut mix_pattern = Vec::new();
    for (action, mix) in draft.mix_pattern.iter().enumerate() {
        if mix.duration_s < 0 {
            return Err(ValidationError::NegativeMixDuration {
                program,
                stage,
                action,
            });
        }
        let duration_s = u32::try_from(mix.duration_s)
            .map_err(|_| ValidationError::DurationOutOfRange { program, stage })?;
        mix_pattern
            .push(MixAction {
                kind: mix.kind,
                duration_s,
            })
            .map_err(|_| ValidationError::TooManyMixActions {
                program,
                stage,
                count: draft.mix_pattern.len(),
            })?;
    }

    Ok(Stage {
        label,
        planned_min,
        target_temp_c: draft.target_temp_c,
        fermentation: draft.fermentation,
        mix_pattern,
        heater: draft.heater,
        light: draft.light,
        buzzer: draft.buzzer,
        instructions,
    })
}
