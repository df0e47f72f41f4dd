use std::{cell::RefCell, rc::Rc};

pub trait SimulationRng: std::fmt::Debug + rand::RngCore {}
impl<T: std::fmt::Debug + rand::RngCore> SimulationRng for T {}
pub type DynRng = Rc<RefCell<dyn SimulationRng>>;

pub fn dyn_rng<Rng: SimulationRng + 'static>(rng: Rng) -> DynRng {
    Rc::new(RefCell::new(rng))
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::Rng;
    use rand_pcg::Pcg64Mcg;

    #[test]
    fn shared_generators_advance_together() {
        let rng = dyn_rng(Pcg64Mcg::new(42));
        let shared = rng.clone();
        let mut reference = Pcg64Mcg::new(42);
        let first: f64 = rng.borrow_mut().gen();
        let second: f64 = shared.borrow_mut().gen();
        assert_eq!(first, reference.gen::<f64>());
        assert_eq!(second, reference.gen::<f64>());
    }
}
