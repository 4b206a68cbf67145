mod skeleton;

pub use skeleton::*;

#[cfg(test)]
mod skeleton_tests;





#[cfg(test)]
mod path_constraint_tests;


#[cfg(test)]
mod skin_tests;

#[cfg(test)]
mod bounds_tests;
