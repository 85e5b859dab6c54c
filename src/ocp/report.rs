use std::{
    fs::File,
    io::{BufRead, BufReader, BufWriter, Write as _},
    path::Path,
};

use crate::{expr::Expr, stage::ShootingStage};

use super::{Error, Ocp};

impl Ocp {
    /// Writes a solved design-variable vector to `path`, one value per line
    /// in vector order at full double precision.
    ///
    /// The line order is the implicit contract with [`load_guess`]: a dump
    /// written here can seed a later solve of the same problem.
    ///
    /// [`load_guess`]: Ocp::load_guess
    ///
    /// # Errors
    ///
    /// Returns [`Error::FileOpen`] if `path` cannot be created and
    /// [`Error::Io`] if writing fails.
    ///
    /// # Panics
    ///
    /// Panics if `values` is shorter than the design vector.
    pub fn write_solution(&self, path: impl AsRef<Path>, values: &[f64]) -> Result<(), Error> {
        let path = path.as_ref();
        let file = File::create(path).map_err(|source| Error::FileOpen {
            path: path.to_path_buf(),
            source,
        })?;
        let io_err = |source| Error::Io {
            path: path.to_path_buf(),
            source,
        };

        let mut writer = BufWriter::new(file);
        for index in 0..self.num_vars() {
            writeln!(writer, "{:.17e}", values[index]).map_err(io_err)?;
        }
        writer.flush().map_err(io_err)
    }

    /// Loads initial guesses from `path`, assigning one value per numeric
    /// line to increasing design-vector indices.
    ///
    /// A line's leading whitespace-delimited token is parsed as a float;
    /// lines that yield no float (headers, comments) are silently skipped.
    /// Loaded values are stored as-is, without clamping to bounds.
    ///
    /// # Errors
    ///
    /// Returns [`Error::FileOpen`] if `path` cannot be opened,
    /// [`Error::Io`] if reading fails, and [`Error::TooManyValues`] if the
    /// file holds more numeric lines than there are design variables; in
    /// that case every slot was already assigned before the failing line.
    pub fn load_guess(&mut self, path: impl AsRef<Path>) -> Result<(), Error> {
        let path = path.as_ref();
        let file = File::open(path).map_err(|source| Error::FileOpen {
            path: path.to_path_buf(),
            source,
        })?;

        let mut next = 0;
        for line in BufReader::new(file).lines() {
            let line = line.map_err(|source| Error::Io {
                path: path.to_path_buf(),
                source,
            })?;
            let Some(token) = line.split_whitespace().next() else {
                continue;
            };
            let Ok(value) = token.parse::<f64>() else {
                continue;
            };
            if next >= self.slots.len() {
                return Err(Error::TooManyValues {
                    path: path.to_path_buf(),
                    capacity: self.slots.len(),
                });
            }
            self.slots.set_guess(next, value);
            next += 1;
        }
        Ok(())
    }

    /// Writes an Octave script to `path` defining the zero-argument
    /// function `name`, which returns the solved problem as a struct.
    ///
    /// The struct carries one `params` field per parameter and one
    /// `multipleShootingStages` sub-struct per stage (`time`, `states`,
    /// `actions`, `outputs`), both in registration order, followed by
    /// top-level `time`, `states`, `actions`, and `outputs` sections that
    /// concatenate the per-stage sequences. Concatenated field names come
    /// from the first registered stage; a field some stage fails to
    /// resolve is skipped, leaving the rest of the report intact.
    ///
    /// # Errors
    ///
    /// Returns [`Error::FileOpen`] if `path` cannot be created and
    /// [`Error::Io`] if writing fails.
    ///
    /// # Panics
    ///
    /// Panics if `values` is shorter than the design vector.
    pub fn write_octave_output(
        &self,
        name: &str,
        path: impl AsRef<Path>,
        values: &[f64],
    ) -> Result<(), Error> {
        let path = path.as_ref();
        let mut out = String::new();

        out.push_str(&format!("function opt = {name}()\n"));
        out.push_str("% states, actions, and outputs of each shooting stage,\n");
        out.push_str("% plus the stage-concatenated trajectories\n\n");
        out.push_str("opt = struct();\n\n");

        out.push_str("% parameters\n");
        out.push_str("opt.params = struct();\n");
        for (param, index) in self.params() {
            out.push_str(&format!(
                "opt.params.{param} = {:.10e};\n",
                values[index]
            ));
        }
        out.push('\n');

        out.push_str("% multiple shooting stages\n");
        out.push_str("opt.multipleShootingStages = struct();\n");
        for stage in self.stages() {
            push_stage(&mut out, stage, values);
        }

        out.push_str("% stage-concatenated trajectories\n");
        let time: Vec<f64> = self
            .stages()
            .flat_map(|stage| eval_all(&stage.time_trajectory(), values))
            .collect();
        out.push_str(&format!("opt.time = {};\n\n", octave_vector(&time)));

        self.push_concatenated(&mut out, "states", ShootingStage::state_trajectory, values);
        self.push_concatenated(&mut out, "actions", ShootingStage::action_trajectory, values);
        self.push_concatenated(&mut out, "outputs", ShootingStage::output_trajectory, values);

        let file = File::create(path).map_err(|source| Error::FileOpen {
            path: path.to_path_buf(),
            source,
        })?;
        let mut writer = BufWriter::new(file);
        writer.write_all(out.as_bytes()).map_err(|source| Error::Io {
            path: path.to_path_buf(),
            source,
        })
    }

    /// Emits one concatenated top-level section. Field names come from the
    /// first registered stage; a name not resolved by every stage is
    /// skipped at that field only.
    fn push_concatenated(
        &self,
        out: &mut String,
        section: &str,
        resolve: impl Fn(&ShootingStage, &str) -> Option<Vec<Expr>>,
        values: &[f64],
    ) {
        out.push_str(&format!("opt.{section} = struct();\n"));

        let names: Vec<String> = match self.stages().next() {
            Some(first) => match section {
                "states" => first.state_names().to_vec(),
                "actions" => first.action_names().to_vec(),
                _ => first.output_names().to_vec(),
            },
            None => Vec::new(),
        };

        for name in &names {
            let mut joined = Vec::new();
            let resolved = self.stages().all(|stage| match resolve(stage, name) {
                Some(trajectory) => {
                    joined.extend(eval_all(&trajectory, values));
                    true
                }
                None => false,
            });
            if resolved {
                out.push_str(&format!(
                    "opt.{section}.{name} = {};\n",
                    octave_vector(&joined)
                ));
            }
        }
        out.push('\n');
    }
}

fn push_stage(out: &mut String, stage: &ShootingStage, values: &[f64]) {
    let prefix = format!("opt.multipleShootingStages.{}", stage.name());

    out.push_str(&format!("{prefix} = struct();\n"));
    let time = eval_all(&stage.time_trajectory(), values);
    out.push_str(&format!("{prefix}.time = {};\n", octave_vector(&time)));

    out.push_str(&format!("{prefix}.states = struct();\n"));
    for name in stage.state_names() {
        if let Some(trajectory) = stage.state_trajectory(name) {
            let evaluated = eval_all(&trajectory, values);
            out.push_str(&format!(
                "{prefix}.states.{name} = {};\n",
                octave_vector(&evaluated)
            ));
        }
    }

    out.push_str(&format!("{prefix}.actions = struct();\n"));
    for name in stage.action_names() {
        if let Some(trajectory) = stage.action_trajectory(name) {
            let evaluated = eval_all(&trajectory, values);
            out.push_str(&format!(
                "{prefix}.actions.{name} = {};\n",
                octave_vector(&evaluated)
            ));
        }
    }

    out.push_str(&format!("{prefix}.outputs = struct();\n"));
    for name in stage.output_names() {
        if let Some(trajectory) = stage.output_trajectory(name) {
            let evaluated = eval_all(&trajectory, values);
            out.push_str(&format!(
                "{prefix}.outputs.{name} = {};\n",
                octave_vector(&evaluated)
            ));
        }
    }
    out.push('\n');
}

fn eval_all(trajectory: &[Expr], values: &[f64]) -> Vec<f64> {
    trajectory.iter().map(|expr| expr.eval(values)).collect()
}

fn octave_vector(values: &[f64]) -> String {
    let rendered: Vec<String> = values.iter().map(|v| format!("{v:.10e}")).collect();
    format!("[{}]", rendered.join(", "))
}

#[cfg(test)]
mod tests {
    use super::*;

    use std::fs;

    use approx::assert_relative_eq;

    use crate::{
        dynamics::{DynamicsModel, StepInput},
        expr::ExprVec,
    };

    /// Forward-Euler cart: pos' = vel, vel' = force.
    struct Cart;

    impl DynamicsModel for Cart {
        fn state_names(&self) -> Vec<String> {
            vec!["pos".into(), "vel".into()]
        }

        fn action_names(&self) -> Vec<String> {
            vec!["force".into()]
        }

        fn output_names(&self) -> Vec<String> {
            vec!["speed".into()]
        }

        fn step(&self, input: &StepInput) -> ExprVec {
            vec![
                &input.state[0] + &input.dt * &input.state[1],
                &input.state[1] + &input.dt * &input.action[0],
            ]
            .into()
        }

        fn output(&self, name: &str, input: &StepInput) -> Option<Expr> {
            (name == "speed").then(|| input.state[1].clone())
        }
    }

    /// One-state rolling ball with no actions and no outputs.
    struct Ball;

    impl DynamicsModel for Ball {
        fn state_names(&self) -> Vec<String> {
            vec!["pos".into()]
        }

        fn action_names(&self) -> Vec<String> {
            Vec::new()
        }

        fn step(&self, input: &StepInput) -> ExprVec {
            vec![input.state[0].clone()].into()
        }
    }

    #[test]
    fn solution_round_trips_through_the_dump_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("solution.txt");

        let mut ocp = Ocp::new();
        ocp.add_param("a").unwrap();
        ocp.add_param("b").unwrap();
        ocp.add_param("c").unwrap();

        let solved = [1.0 / 3.0, -2.75e-7, 6.02214076e23];
        ocp.write_solution(&path, &solved).unwrap();

        ocp.load_guess(&path).unwrap();
        let guesses = ocp.guesses();
        for (loaded, original) in guesses.iter().zip(solved) {
            assert_relative_eq!(*loaded, original, max_relative = 1e-14);
        }
    }

    #[test]
    fn dump_is_one_bare_value_per_line() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("solution.txt");

        let mut ocp = Ocp::new();
        ocp.add_param("a").unwrap();
        ocp.add_param("b").unwrap();

        ocp.write_solution(&path, &[1.5, -2.0]).unwrap();

        let contents = fs::read_to_string(&path).unwrap();
        let lines: Vec<_> = contents.lines().collect();
        assert_eq!(lines.len(), 2);
        assert_relative_eq!(lines[0].parse::<f64>().unwrap(), 1.5);
        assert_relative_eq!(lines[1].parse::<f64>().unwrap(), -2.0);
    }

    #[test]
    fn guess_loading_skips_unparseable_lines() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("guess.txt");
        fs::write(&path, "% header\n1.5\n\nnot a number\n2.5\n").unwrap();

        let mut ocp = Ocp::new();
        ocp.add_param("a").unwrap();
        ocp.add_param("b").unwrap();

        ocp.load_guess(&path).unwrap();

        assert_eq!(ocp.guesses(), vec![1.5, 2.5]);
    }

    #[test]
    fn guess_loading_ignores_bounds() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("guess.txt");
        fs::write(&path, "99.0\n").unwrap();

        let mut ocp = Ocp::new();
        ocp.add_param("a").unwrap();
        ocp.bound_param("a", 0.0, 1.0).unwrap();

        ocp.load_guess(&path).unwrap();

        assert_relative_eq!(ocp.guesses()[0], 99.0);
    }

    #[test]
    fn overlong_guess_file_fails_after_filling_every_slot() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("guess.txt");
        fs::write(&path, "1.0\n2.0\n3.0\n").unwrap();

        let mut ocp = Ocp::new();
        ocp.add_param("a").unwrap();
        ocp.add_param("b").unwrap();

        let err = ocp.load_guess(&path).unwrap_err();

        assert!(matches!(err, Error::TooManyValues { capacity: 2, .. }));
        assert_eq!(ocp.guesses(), vec![1.0, 2.0]);
    }

    #[test]
    fn missing_guess_file_is_a_typed_error() {
        let mut ocp = Ocp::new();
        let err = ocp.load_guess("/nonexistent/guess.txt").unwrap_err();
        assert!(matches!(err, Error::FileOpen { .. }));
    }

    #[test]
    fn octave_report_nests_params_and_stages() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("result.m");

        let mut ocp = Ocp::new();
        ocp.add_param("mass").unwrap();
        ocp.add_multiple_shooting("arm", Cart, 0.0, 1.0, 2).unwrap();

        // mass, then 2 intervals of (pos, vel, force).
        let solved = [3.0, 0.0, 1.0, 0.5, 1.0, 1.5, 0.5];
        ocp.write_octave_output("result", &path, &solved).unwrap();

        let contents = fs::read_to_string(&path).unwrap();
        assert!(contents.starts_with("function opt = result()\n"));
        assert!(contents.contains("opt.params.mass = 3.0000000000e0;"));
        assert!(contents.contains("opt.multipleShootingStages.arm = struct();"));
        assert!(contents.contains("opt.multipleShootingStages.arm.states.pos ="));
        assert!(contents.contains("opt.multipleShootingStages.arm.actions.force ="));
        assert!(contents.contains("opt.multipleShootingStages.arm.outputs.speed ="));
        assert!(contents.contains("opt.time = [0.0000000000e0, 1.0000000000e0];"));
        assert!(contents.contains("opt.states.vel = [1.0000000000e0, 1.5000000000e0];"));
    }

    #[test]
    fn concatenation_spans_stages_in_registration_order() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("result.m");

        let mut ocp = Ocp::new();
        ocp.add_multiple_shooting("first", Cart, 0.0, 1.0, 2).unwrap();
        ocp.add_multiple_shooting("second", Ball, 1.0, 2.0, 2).unwrap();

        // first: 2 * (pos, vel, force); second: 2 * (pos,).
        let solved = [0.0, 1.0, 0.5, 1.0, 1.0, 0.5, 7.0, 7.0];
        ocp.write_octave_output("result", &path, &solved).unwrap();

        let contents = fs::read_to_string(&path).unwrap();

        // "pos" resolves in both stages and spans all four intervals.
        assert!(contents.contains(
            "opt.states.pos = [0.0000000000e0, 1.0000000000e0, 7.0000000000e0, 7.0000000000e0];"
        ));
        // "vel" is missing from the second stage: the field is skipped, the
        // report survives.
        assert!(!contents.contains("opt.states.vel ="));
        assert!(contents.contains("opt.states = struct();"));
        // Per-stage records still carry the first stage's vel.
        assert!(contents.contains("opt.multipleShootingStages.first.states.vel ="));
    }

    #[test]
    fn empty_problem_still_reports() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("empty.m");

        let ocp = Ocp::new();
        ocp.write_octave_output("empty", &path, &[]).unwrap();

        let contents = fs::read_to_string(&path).unwrap();
        assert!(contents.contains("opt.params = struct();"));
        assert!(contents.contains("opt.time = [];"));
    }
}
