mod arithmetic_tests;
mod others_tests;
mod shape_tests;
