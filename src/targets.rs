use rand::Rng;

/// How the host for each attempt is chosen.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TargetPicker {
	/// A single host given on the command line, used for every attempt.
	Fixed(String),
	/// Hosts loaded from a file; each attempt draws uniformly from the whole list.
	Random(Vec<String>),
}

impl TargetPicker {
	pub fn pick<R: Rng + ?Sized>(&self, rng: &mut R) -> &str {
		match self {
			TargetPicker::Fixed(host) => host.as_str(),
			TargetPicker::Random(hosts) => hosts[rng.random_range(0..hosts.len())].as_str(),
		}
	}

	pub fn hosts(&self) -> &[String] {
		match self {
			TargetPicker::Fixed(host) => std::slice::from_ref(host),
			TargetPicker::Random(hosts) => hosts.as_slice(),
		}
	}
}

#[cfg(test)]
mod tests {
	use super::*;
	use rand::SeedableRng;
	use rand::rngs::StdRng;
	use std::collections::HashSet;

	#[test]
	fn fixed_always_returns_same_host() {
		let picker = TargetPicker::Fixed("10.0.0.1".to_string());
		let mut rng = StdRng::seed_from_u64(7);
		for _ in 0..5 {
			assert_eq!(picker.pick(&mut rng), "10.0.0.1");
		}
	}

	#[test]
	fn random_reaches_every_host_including_last() {
		let hosts = vec!["a".to_string(), "b".to_string(), "c".to_string()];
		let picker = TargetPicker::Random(hosts);
		let mut rng = StdRng::seed_from_u64(42);
		let seen: HashSet<&str> = (0..200).map(|_| picker.pick(&mut rng)).collect();
		assert_eq!(seen.len(), 3);
		assert!(seen.contains("c"));
	}

	#[test]
	fn random_with_single_host_works() {
		let picker = TargetPicker::Random(vec!["only".to_string()]);
		let mut rng = StdRng::seed_from_u64(1);
		assert_eq!(picker.pick(&mut rng), "only");
	}
}
