//! Drives an undamped spring mass system to x=1 (at rest), from the origin,
//! with both iLQG and GNMS, then replays the obtained feedback policies.
use std::sync::Arc;

use log::{error, info};
use nalgebra::{Matrix1, Matrix2, Vector1, Vector2};

use optcon::prelude::{
    system_factory, Algorithm, Config, Integrator, OptConProblem, Policy, QuadraticCost,
    Rollout, SecondOrderSystem, Solver, SolverState,
};

fn main() {
    env_logger::builder()
        .filter_level(log::LevelFilter::Info)
        .parse_default_env()
        .init();

    let target = Vector2::new(1.0, 0.0);

    let cost = QuadraticCost::<2, 1>::new(Matrix2::identity() * 0.1, Matrix1::new(0.1))
        .with_terminal(target, Matrix2::identity() * 100.0);

    let problem = OptConProblem::with_numdiff(
        Vector2::zeros(),
        system_factory(SecondOrderSystem::default),
        Arc::new(cost),
    );

    for algorithm in [Algorithm::ILQG, Algorithm::GNMS] {
        let cfg = match algorithm {
            Algorithm::ILQG => Config::ilqg_preset(3.0, 0.01),
            Algorithm::GNMS => Config::gnms_preset(3.0, 0.01),
        }
        .with_threads(2);

        let mut solver = match Solver::new(problem.clone(), &cfg) {
            Ok(solver) => solver,
            Err(e) => {
                error!("failed to deploy {} solver: {}", algorithm, e);
                continue;
            },
        };

        let initial_guess = Policy::constant(Vector1::zeros(), cfg.horizon_steps(), cfg.dt);

        if let Err(e) = solver.set_initial_guess(&initial_guess) {
            error!("{} initial guess: {}", algorithm, e);
            continue;
        }

        match solver.solve() {
            Ok(SolverState::Converged) => {},
            Ok(state) => {
                error!("{} terminated in {} state", algorithm, state);
                continue;
            },
            Err(e) => {
                error!("{} failed: {}", algorithm, e);
                continue;
            },
        }

        let Ok(policy) = solver.solution() else {
            continue;
        };

        // replay the feedback policy from a perturbed initial state
        let rollout = Rollout::new(Integrator::from_config(&cfg), cfg.dt, cfg.horizon_steps());
        let mut system = SecondOrderSystem::default();

        match rollout.closed_loop(&mut system, &Vector2::new(0.1, -0.1), &policy) {
            Ok((states, _)) => {
                if let Some(x_final) = states.back() {
                    info!(
                        "{} - {} iterations, cost={:.6e}, replayed final state error={:.3e}",
                        algorithm,
                        solver.iterations(),
                        solver.cost().unwrap_or(f64::NAN),
                        (x_final - target).norm()
                    );
                }
            },
            Err(e) => error!("{} replay: {}", algorithm, e),
        }
    }
}
